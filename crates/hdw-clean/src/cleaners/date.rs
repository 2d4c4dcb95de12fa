use hdw_common::{has_column, set_i64_column, set_text_column, text_column};
use hdw_model::{CleanReport, Entity};
use polars::prelude::DataFrame;
use tracing::warn;

use super::EntityCleaner;
use crate::dates::{DateParts, parse_date};
use crate::error::Result;

/// Date dimension cleaner.
///
/// Rows without a parseable `date` are already gone after coercion; every
/// derived column is then recomputed from `date`, whatever the source held.
pub struct DateCleaner;

impl EntityCleaner for DateCleaner {
    fn entity(&self) -> Entity {
        Entity::Date
    }

    fn apply_rules(&self, df: &mut DataFrame, report: &mut CleanReport) -> Result<()> {
        if !has_column(df, "date") {
            for column in self.schema().derived {
                report.skip_rule(column, "derive from date");
            }
            return Ok(());
        }

        let parts: Vec<Option<DateParts>> = text_column(df, "date")?
            .iter()
            .map(|value| value.as_deref().and_then(parse_date).map(DateParts::from_date))
            .collect();
        let unparsed = parts.iter().filter(|part| part.is_none()).count();
        if unparsed > 0 {
            warn!(unparsed, "date rows left without derived fields");
        }

        let ints = |f: fn(&DateParts) -> i64| -> Vec<Option<i64>> {
            parts.iter().map(|part| part.as_ref().map(f)).collect()
        };
        set_i64_column(df, "date_id", ints(|p| p.date_id))?;
        set_i64_column(df, "year", ints(|p| p.year))?;
        set_i64_column(df, "month", ints(|p| p.month))?;
        set_i64_column(df, "day", ints(|p| p.day))?;
        set_i64_column(df, "quarter", ints(|p| p.quarter))?;
        let names = parts
            .iter()
            .map(|part| part.as_ref().map(|p| p.day_name.clone()))
            .collect();
        set_text_column(df, "day_name", names)?;
        Ok(())
    }
}
