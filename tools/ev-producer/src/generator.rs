//! Synthetic analytics events.
//!
//! Two user id distributions are available:
//!
//! - [`UserIdMix::Steady`]: 70% numeric ids, 15% `user_N`, 10% `anonymous`,
//!   5% `guest`
//! - [`UserIdMix::Burst`]: UUID strings for the `api` source, numeric ids
//!   everywhere else

use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde_json::{json, Map, Value};
use shared_types::{EventMetadata, RawEvent, UserId};
use uuid::{Builder, Uuid};

pub const EVENT_TYPES: [&str; 8] = [
    "page_view",
    "button_click",
    "form_submit",
    "search",
    "purchase",
    "signup",
    "login",
    "logout",
];

pub const SOURCES: [&str; 4] = ["web", "mobile-ios", "mobile-android", "api"];

pub const SCHEMA_VERSION: &str = "1.0.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserIdMix {
    Steady,
    Burst,
}

fn random_uuid<R: Rng>(rng: &mut R) -> Uuid {
    Builder::from_random_bytes(rng.gen()).into_uuid()
}

fn user_id<R: Rng>(rng: &mut R, mix: UserIdMix, source: &str) -> UserId {
    match mix {
        UserIdMix::Steady => {
            let roll: f64 = rng.gen();
            if roll < 0.70 {
                UserId::Numeric(rng.gen_range(0..1_000_000))
            } else if roll < 0.85 {
                UserId::Text(format!("user_{}", rng.gen_range(0..10_000)))
            } else if roll < 0.95 {
                UserId::Text("anonymous".to_string())
            } else {
                UserId::Text("guest".to_string())
            }
        }
        UserIdMix::Burst if source == "api" => UserId::Text(random_uuid(rng).to_string()),
        UserIdMix::Burst => UserId::Numeric(rng.gen_range(0..1_000_000)),
    }
}

/// One random event, timestamped now.
pub fn generate_event<R: Rng>(rng: &mut R, mix: UserIdMix) -> RawEvent {
    let event_type = EVENT_TYPES[rng.gen_range(0..EVENT_TYPES.len())];
    let source = SOURCES[rng.gen_range(0..SOURCES.len())];

    let mut properties = Map::new();
    properties.insert(
        "url".to_string(),
        json!(format!("https://example.com/{}", event_type)),
    );
    properties.insert(
        "referrer".to_string(),
        if rng.gen_bool(0.5) {
            json!("https://google.com")
        } else {
            Value::Null
        },
    );
    properties.insert("duration".to_string(), json!(rng.gen_range(0..10_000)));

    RawEvent {
        event_id: Some(random_uuid(rng).to_string()),
        user_id: user_id(rng, mix, source),
        session_id: random_uuid(rng).to_string(),
        event_type: event_type.to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        properties,
        metadata: EventMetadata {
            source: source.to_string(),
            version: SCHEMA_VERSION.to_string(),
            processed_at: None,
        },
    }
}

/// `count` random events.
pub fn generate_events<R: Rng>(rng: &mut R, mix: UserIdMix, count: usize) -> Vec<RawEvent> {
    (0..count).map(|_| generate_event(rng, mix)).collect()
}
