use hdw_common::{f64_column, has_column, set_f64_column};
use hdw_model::{CleanReport, Entity};
use polars::prelude::DataFrame;

use super::EntityCleaner;
use crate::coerce::clip_column;
use crate::error::Result;

const PAYMENT: &str = "patient_payment";
const TOTAL_COST: &str = "total_cost";
const COVERAGE: &str = "insurance_coverage";

/// Visit cleaner: reconciles missing patient payments from cost and coverage.
pub struct VisitCleaner;

/// Out-of-pocket amount for a visit, never negative.
pub fn reconcile_payment(total_cost: f64, insurance_coverage: f64) -> f64 {
    (total_cost - insurance_coverage).max(0.0)
}

impl EntityCleaner for VisitCleaner {
    fn entity(&self) -> Entity {
        Entity::Visit
    }

    fn apply_rules(&self, df: &mut DataFrame, report: &mut CleanReport) -> Result<()> {
        let absent: Vec<&str> = [PAYMENT, TOTAL_COST, COVERAGE]
            .into_iter()
            .filter(|name| !has_column(df, name))
            .collect();
        if !absent.is_empty() {
            for column in absent {
                report.skip_rule(column, "reconcile patient_payment");
            }
            return Ok(());
        }

        let costs = f64_column(df, TOTAL_COST)?;
        let coverage = f64_column(df, COVERAGE)?;
        let mut reconciled = 0usize;
        let payments: Vec<Option<f64>> = f64_column(df, PAYMENT)?
            .into_iter()
            .zip(costs.iter().zip(coverage.iter()))
            .map(|(payment, (cost, covered))| match payment {
                Some(value) => Some(value),
                None => {
                    reconciled += 1;
                    Some(reconcile_payment(cost.unwrap_or(0.0), covered.unwrap_or(0.0)))
                }
            })
            .collect();
        set_f64_column(df, PAYMENT, payments)?;
        report.record_defaults(PAYMENT, reconciled);

        if let Some(spec) = self.schema().column(PAYMENT) {
            clip_column(df, spec)?;
        }
        Ok(())
    }
}
