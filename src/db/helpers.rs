use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{RelationKind, WarningLevel};

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_relation_kind(value: &str) -> Result<RelationKind> {
    match value {
        "Caregiver" => Ok(RelationKind::Caregiver),
        "Family" => Ok(RelationKind::Family),
        "Medical" => Ok(RelationKind::Medical),
        other => Err(anyhow!("unknown relation kind {other}")),
    }
}

pub fn parse_warning_level(value: &str) -> Result<WarningLevel> {
    match value {
        "Normal" => Ok(WarningLevel::Normal),
        "High" => Ok(WarningLevel::High),
        "VeryHigh" => Ok(WarningLevel::VeryHigh),
        other => Err(anyhow!("unknown warning level {other}")),
    }
}
