//! Pre-built Test Fixtures
//!
//! Fixed, predictable data for unit and integration tests.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use core_kernel::{DateRange, Money, UserId};
use domain_cases::{Actor, Role};
use rust_decimal_macros::dec;
use uuid::Uuid;

/// Fixture for Money test data
pub struct MoneyFixtures;

impl MoneyFixtures {
    /// Standard per-case fee of a client
    pub fn case_fee() -> Money {
        Money::new(dec!(150.00))
    }

    /// Standard claim amount of a case
    pub fn claim_amount() -> Money {
        Money::new(dec!(980.25))
    }

    pub fn zero() -> Money {
        Money::zero()
    }
}

/// Fixture for temporal test data
pub struct TemporalFixtures;

impl TemporalFixtures {
    /// Start of Q1 2024
    pub fn quarter_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    /// End of Q1 2024
    pub fn quarter_end() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap()
    }

    /// January to March 2024, inclusive
    pub fn first_quarter() -> DateRange {
        DateRange::new(Self::quarter_start(), Self::quarter_end()).unwrap()
    }

    /// A window wide enough to include anything created by a running test
    pub fn around_now() -> DateRange {
        let now = Utc::now();
        DateRange::new(now - chrono::Duration::days(1), now + chrono::Duration::days(1)).unwrap()
    }

    pub fn assistance_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
    }
}

/// Fixture for identifier test data
pub struct IdFixtures;

impl IdFixtures {
    pub fn admin_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440001").unwrap())
    }

    pub fn employee_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440002").unwrap())
    }

    pub fn other_employee_id() -> UserId {
        UserId::from_uuid(Uuid::parse_str("550e8400-e29b-41d4-a716-446655440003").unwrap())
    }
}

/// Fixture for the users acting on cases
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn admin() -> Actor {
        Actor::new(IdFixtures::admin_id(), "Alex Admin", Role::Admin)
    }

    pub fn employee() -> Actor {
        Actor::new(IdFixtures::employee_id(), "Erin Employee", Role::Employee)
    }

    /// An employee who did not create the fixture cases
    pub fn other_employee() -> Actor {
        Actor::new(IdFixtures::other_employee_id(), "Omar Other", Role::Employee)
    }
}

/// Fixture for string test data
pub struct StringFixtures;

impl StringFixtures {
    pub fn client_name() -> &'static str {
        "C1"
    }

    pub fn hospital_name() -> &'static str {
        "H"
    }

    pub fn region() -> &'static str {
        "GCC"
    }

    pub fn country() -> &'static str {
        "UAE"
    }

    pub fn patient_name() -> &'static str {
        "Jane Roe"
    }
}
