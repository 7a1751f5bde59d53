//! Faker-style value generators backed by the `fake` corpora.
//!
//! Method names follow the common faker vocabulary (`first_name`, `email`,
//! `date_this_year`, ...). `mimesis.<category>.<method>` generators are mapped
//! onto the closest faker method.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use fake::faker::address::en::{
    BuildingNumber, CityName, CountryName, StateAbbr, StateName, StreetName, ZipCode,
};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::{FreeEmail, IPv4, SafeEmail, Username};
use fake::faker::job::en::Title as JobTitle;
use fake::faker::lorem::en::{Paragraph, Sentence, Word};
use fake::faker::name::en::{FirstName, LastName, Name};
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;
use serde_json::Value as JsonValue;
use uuid::Builder;

fn random_date<R: Rng + ?Sized>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> NaiveDate {
    let span = (end - start).num_days().max(0);
    start + Duration::days(rng.gen_range(0..=span))
}

fn random_datetime<R: Rng + ?Sized>(rng: &mut R, start: NaiveDate, end: NaiveDate) -> String {
    let date = random_date(rng, start, end);
    let secs = rng.gen_range(0..86_400u32);
    let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, 0).unwrap_or_default();
    date.and_time(time).format("%Y-%m-%dT%H:%M:%S").to_string()
}

fn year_start(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today)
}

fn decade_start(today: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(today.year() - today.year().rem_euclid(10), 1, 1).unwrap_or(today)
}

fn years_ago(today: NaiveDate, years: i32) -> NaiveDate {
    today
        .with_year(today.year() - years)
        .or_else(|| NaiveDate::from_ymd_opt(today.year() - years, 2, 28))
        .unwrap_or(today)
}

fn street_address<R: Rng + ?Sized>(rng: &mut R) -> String {
    let number: String = BuildingNumber().fake_with_rng(rng);
    let street: String = StreetName().fake_with_rng(rng);
    format!("{} {}", number, street)
}

fn uuid4<R: Rng + ?Sized>(rng: &mut R) -> String {
    Builder::from_random_bytes(rng.gen()).into_uuid().to_string()
}

/// Generate a value for a faker method name, or `None` if the method is unknown.
pub fn generate<R: Rng + ?Sized>(method: &str, rng: &mut R, today: NaiveDate) -> Option<JsonValue> {
    let text = |s: String| Some(JsonValue::String(s));
    match method {
        "first_name" => text(FirstName().fake_with_rng(rng)),
        "last_name" => text(LastName().fake_with_rng(rng)),
        "name" => text(Name().fake_with_rng(rng)),
        "email" | "safe_email" | "company_email" => text(SafeEmail().fake_with_rng(rng)),
        "free_email" => text(FreeEmail().fake_with_rng(rng)),
        "user_name" | "username" => text(Username().fake_with_rng(rng)),
        "phone_number" => text(PhoneNumber().fake_with_rng(rng)),
        "street_address" => text(street_address(rng)),
        "address" => {
            let street = street_address(rng);
            let city: String = CityName().fake_with_rng(rng);
            let state: String = StateAbbr().fake_with_rng(rng);
            let zip: String = ZipCode().fake_with_rng(rng);
            text(format!("{}\n{}, {} {}", street, city, state, zip))
        }
        "city" => text(CityName().fake_with_rng(rng)),
        "state" => text(StateName().fake_with_rng(rng)),
        "state_abbr" => text(StateAbbr().fake_with_rng(rng)),
        "zipcode" | "postcode" => text(ZipCode().fake_with_rng(rng)),
        "country" => text(CountryName().fake_with_rng(rng)),
        "company" => text(CompanyName().fake_with_rng(rng)),
        "job" => text(JobTitle().fake_with_rng(rng)),
        "word" => text(Word().fake_with_rng(rng)),
        "sentence" => text(Sentence(3..8).fake_with_rng(rng)),
        "paragraph" => text(Paragraph(2..4).fake_with_rng(rng)),
        "text" => text(Paragraph(3..6).fake_with_rng(rng)),
        "ipv4" => text(IPv4().fake_with_rng(rng)),
        "uuid4" => text(uuid4(rng)),
        "boolean" | "pybool" => Some(JsonValue::Bool(rng.gen())),
        "random_digit" => Some(JsonValue::from(rng.gen_range(0..10))),
        "random_int" => Some(JsonValue::from(rng.gen_range(0..=9999))),
        "date_this_year" => text(random_date(rng, year_start(today), today).to_string()),
        "date_this_decade" => text(random_date(rng, decade_start(today), today).to_string()),
        "date_of_birth" => {
            text(random_date(rng, years_ago(today, 90), years_ago(today, 18)).to_string())
        }
        "date_time_this_year" => text(random_datetime(rng, year_start(today), today)),
        "date_time_this_decade" => text(random_datetime(rng, decade_start(today), today)),
        _ => None,
    }
}

/// Faker method closest to a `mimesis` `<category>.<method>` pair.
pub fn mimesis_alias(category: &str, method: &str) -> Option<&'static str> {
    Some(match (category, method) {
        ("person", "first_name") | ("person", "name") => "first_name",
        ("person", "last_name") | ("person", "surname") => "last_name",
        ("person", "full_name") => "name",
        ("person", "email") => "email",
        ("person", "telephone") | ("person", "phone_number") => "phone_number",
        ("person", "username") => "user_name",
        ("person", "occupation") => "job",
        ("address", "address") => "street_address",
        ("address", "city") => "city",
        ("address", "state") | ("address", "region") => "state",
        ("address", "zip_code") | ("address", "postal_code") => "zipcode",
        ("address", "country") => "country",
        ("finance", "company") => "company",
        ("text", "word") => "word",
        ("text", "sentence") => "sentence",
        ("text", "text") | ("text", "quote") => "text",
        ("datetime", "date") => "date_this_decade",
        ("datetime", "datetime") => "date_time_this_decade",
        ("internet", "ip_v4") => "ipv4",
        ("cryptographic", "uuid") => "uuid4",
        ("development", "boolean") => "boolean",
        _ => return None,
    })
}

/// Evaluate a `faker.<method>` or `mimesis.<category>.<method>` generator string.
pub fn from_generator<R: Rng + ?Sized>(
    generator: &str,
    rng: &mut R,
    today: NaiveDate,
) -> Option<JsonValue> {
    if let Some(method) = generator.strip_prefix("faker.") {
        return generate(method, rng, today);
    }
    let rest = generator.strip_prefix("mimesis.")?;
    let (category, method) = rest.split_once('.')?;
    let alias = mimesis_alias(category, method).unwrap_or(method);
    generate(alias, rng, today)
}

/// Whether `generator` names a faker or mimesis method.
pub fn is_library_generator(generator: &str) -> bool {
    generator.starts_with("faker.") || generator.starts_with("mimesis.")
}
