//! Request shapes of the method-call API.
//!
//! Each shape is a static [`Schema`] plus a typed view built from the
//! validated [`Record`].

use chrono::NaiveDate;
use scoring_core::{CrossFieldRule, Field, FieldKind, Gender, Record, Schema};
use serde_json::{Map, Value};

static METHOD_REQUEST_FIELDS: [Field; 5] = [
    Field::new("account", FieldKind::Char).nullable(),
    Field::new("login", FieldKind::Char).required().nullable(),
    Field::new("token", FieldKind::Char).required().nullable(),
    Field::new("arguments", FieldKind::Arguments)
        .required()
        .nullable(),
    Field::new("method", FieldKind::Char).required(),
];

/// The envelope every call arrives in.
pub static METHOD_REQUEST: Schema = Schema::new("method_request", &METHOD_REQUEST_FIELDS);

static ONLINE_SCORE_FIELDS: [Field; 6] = [
    Field::new("first_name", FieldKind::Char).nullable(),
    Field::new("last_name", FieldKind::Char).nullable(),
    Field::new("email", FieldKind::Email).nullable(),
    Field::new("phone", FieldKind::Phone).nullable(),
    Field::new("birthday", FieldKind::BirthDay).nullable(),
    Field::new("gender", FieldKind::Gender).nullable(),
];

static ONLINE_SCORE_RULES: [CrossFieldRule; 1] = [CrossFieldRule::new(
    "enough_arguments",
    has_identifying_pair,
    "not enough arguments",
)];

/// Arguments of the `online_score` method.
pub static ONLINE_SCORE: Schema =
    Schema::new("online_score", &ONLINE_SCORE_FIELDS).with_rules(&ONLINE_SCORE_RULES);

static CLIENTS_INTERESTS_FIELDS: [Field; 2] = [
    Field::new("client_ids", FieldKind::ClientIds).required(),
    Field::new("date", FieldKind::Date).nullable(),
];

static CLIENTS_INTERESTS_RULES: [CrossFieldRule; 1] = [CrossFieldRule::new(
    "non_empty_clients",
    has_clients,
    "empty client list",
)];

/// Arguments of the `clients_interests` method.
pub static CLIENTS_INTERESTS: Schema = Schema::new("clients_interests", &CLIENTS_INTERESTS_FIELDS)
    .with_rules(&CLIENTS_INTERESTS_RULES);

fn has_identifying_pair(record: &Record) -> bool {
    let both = |a: &str, b: &str| record.is_set(a) && record.is_set(b);
    both("phone", "email") || both("first_name", "last_name") || both("gender", "birthday")
}

fn has_clients(record: &Record) -> bool {
    record.client_ids("client_ids").is_some_and(|ids| !ids.is_empty())
}

/// A validated call envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRequest {
    /// Caller account, if any.
    pub account: Option<String>,
    /// Caller login.
    pub login: Option<String>,
    /// Authentication token.
    pub token: Option<String>,
    /// Raw method arguments; a null `arguments` becomes an empty mapping.
    pub arguments: Map<String, Value>,
    /// Method name.
    pub method: String,
    is_admin: bool,
}

impl MethodRequest {
    /// Builds the envelope from a record validated against [`METHOD_REQUEST`].
    ///
    /// `admin_login` is the login that marks the caller as administrator.
    #[must_use]
    pub fn from_record(record: &Record, admin_login: &str) -> Self {
        let login = record.text("login").map(str::to_string);
        Self {
            account: record.text("account").map(str::to_string),
            is_admin: login.as_deref() == Some(admin_login),
            login,
            token: record.text("token").map(str::to_string),
            arguments: record.object("arguments").cloned().unwrap_or_default(),
            method: record.text("method").unwrap_or_default().to_string(),
        }
    }

    /// Returns `true` if the caller logged in as administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.is_admin
    }
}

/// Arguments of an `online_score` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnlineScoreRequest {
    /// First name.
    pub first_name: Option<String>,
    /// Last name.
    pub last_name: Option<String>,
    /// Email address.
    pub email: Option<String>,
    /// Phone number, always as digits.
    pub phone: Option<String>,
    /// Birthday.
    pub birthday: Option<NaiveDate>,
    /// Gender.
    pub gender: Option<Gender>,
}

impl OnlineScoreRequest {
    /// Builds the arguments from a record validated against [`ONLINE_SCORE`].
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        let text = |name: &str| record.text(name).map(str::to_string);
        Self {
            first_name: text("first_name"),
            last_name: text("last_name"),
            email: text("email"),
            phone: text("phone"),
            birthday: record.date("birthday"),
            gender: record.gender("gender"),
        }
    }
}

/// Arguments of a `clients_interests` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientsInterestsRequest {
    /// Client ids, never empty once validated.
    pub client_ids: Vec<u64>,
    /// Optional date.
    pub date: Option<NaiveDate>,
}

impl ClientsInterestsRequest {
    /// Builds the arguments from a record validated against [`CLIENTS_INTERESTS`].
    #[must_use]
    pub fn from_record(record: &Record) -> Self {
        Self {
            client_ids: record.client_ids("client_ids").unwrap_or_default().to_vec(),
            date: record.date("date"),
        }
    }

    /// Number of clients asked about.
    #[must_use]
    pub fn nclients(&self) -> usize {
        self.client_ids.len()
    }
}
