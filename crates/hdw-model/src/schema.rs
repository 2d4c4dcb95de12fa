//! Static per-entity schema descriptors.
//!
//! A descriptor lists the columns a cleaner works on, how each one is typed,
//! which text rule applies, what happens when a value is missing or invalid,
//! and the projection of the cleaned table into its dimension.

use serde::Serialize;

use crate::entity::Entity;
use crate::policy::{DefaultPolicy, FillValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ColumnKind {
    Integer,
    Decimal,
    Text,
    /// Calendar date, rewritten as `YYYY-MM-DD`.
    Date,
    /// Text restricted to a closed set of canonical spellings.
    Category(&'static CategorySet),
}

impl ColumnKind {
    pub fn label(&self) -> &'static str {
        match self {
            ColumnKind::Integer => "integer",
            ColumnKind::Decimal => "decimal",
            ColumnKind::Text => "text",
            ColumnKind::Date => "date",
            ColumnKind::Category(_) => "category",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnKind::Integer | ColumnKind::Decimal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TextRule {
    #[default]
    Keep,
    Trim,
    TitleCase,
    UpperCase,
}

/// Closed value set with optional aliases (`"M"` for `"Male"`).
#[derive(Debug, PartialEq, Eq, Serialize)]
pub struct CategorySet {
    pub values: &'static [&'static str],
    pub aliases: &'static [(&'static str, &'static str)],
}

impl CategorySet {
    /// Canonical spelling for `raw`, ignoring case and separator differences.
    pub fn canonical(&self, raw: &str) -> Option<&'static str> {
        let wanted = fold(raw);
        if wanted.is_empty() {
            return None;
        }
        if let Some(value) = self.values.iter().find(|value| fold(value) == wanted) {
            return Some(value);
        }
        self.aliases
            .iter()
            .find(|(alias, _)| fold(alias) == wanted)
            .map(|(_, value)| *value)
    }
}

fn fold(value: &str) -> String {
    value
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Inclusive clip range for numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Bounds {
    pub const NON_NEGATIVE: Bounds = Bounds {
        lower: 0.0,
        upper: None,
    };

    pub const fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn clip(&self, value: f64) -> f64 {
        let value = value.max(self.lower);
        match self.upper {
            Some(upper) => value.min(upper),
            None => value,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub text: TextRule,
    pub policy: DefaultPolicy,
    pub bounds: Option<Bounds>,
    /// Round decimal input to the nearest integer (ties away from zero)
    /// instead of rejecting it.
    pub rounding: bool,
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind, text: TextRule) -> Self {
        Self {
            name,
            kind,
            text,
            policy: DefaultPolicy::KeepMissing,
            bounds: None,
            rounding: false,
        }
    }

    pub const fn integer(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Integer, TextRule::Trim)
    }

    pub const fn decimal(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Decimal, TextRule::Trim)
    }

    pub const fn text(name: &'static str, rule: TextRule) -> Self {
        Self::new(name, ColumnKind::Text, rule)
    }

    pub const fn date(name: &'static str) -> Self {
        Self::new(name, ColumnKind::Date, TextRule::Trim)
    }

    pub const fn category(name: &'static str, set: &'static CategorySet) -> Self {
        Self::new(name, ColumnKind::Category(set), TextRule::Trim)
    }

    pub const fn with_policy(mut self, policy: DefaultPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub const fn with_bounds(mut self, bounds: Bounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub const fn rounded(mut self) -> Self {
        self.rounding = true;
        self
    }
}

/// Projection of a cleaned entity table into a dimension table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DimensionSpec {
    pub name: &'static str,
    pub columns: &'static [&'static str],
}

impl DimensionSpec {
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntitySchema {
    pub entity: Entity,
    /// Natural key used for deduplication.
    pub key: &'static str,
    pub columns: &'static [ColumnSpec],
    /// Columns recomputed by the entity's own rules.
    pub derived: &'static [&'static str],
    pub dimension: Option<DimensionSpec>,
}

impl EntitySchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|spec| spec.name == name)
    }
}

pub static GENDERS: CategorySet = CategorySet {
    values: &["Male", "Female", "Unknown"],
    aliases: &[("M", "Male"), ("F", "Female")],
};

pub static DOCTOR_STATUSES: CategorySet = CategorySet {
    values: &["Active", "On Leave"],
    aliases: &[],
};

pub static VISIT_TYPES: CategorySet = CategorySet {
    values: &["Rawat Jalan", "Rawat Inap", "IGD"],
    aliases: &[],
};

static PATIENT: EntitySchema = EntitySchema {
    entity: Entity::Patient,
    key: "patient_id",
    columns: &[
        ColumnSpec::integer("patient_id"),
        ColumnSpec::text("patient_name", TextRule::Trim),
        ColumnSpec::category("gender", &GENDERS)
            .with_policy(DefaultPolicy::ConstantFill(FillValue::Text("Unknown"))),
        ColumnSpec::integer("age")
            .rounded()
            .with_policy(DefaultPolicy::MedianFill)
            .with_bounds(Bounds::between(0.0, 120.0)),
        ColumnSpec::text("city", TextRule::TitleCase),
        ColumnSpec::text("insurance_type", TextRule::Trim)
            .with_policy(DefaultPolicy::ConstantFill(FillValue::Text("Uninsured"))),
    ],
    derived: &[],
    dimension: Some(DimensionSpec {
        name: "dim_patients",
        columns: &[
            "patient_id",
            "patient_name",
            "gender",
            "age",
            "city",
            "insurance_type",
        ],
    }),
};

static DOCTOR: EntitySchema = EntitySchema {
    entity: Entity::Doctor,
    key: "doctor_id",
    columns: &[
        ColumnSpec::integer("doctor_id"),
        ColumnSpec::text("doctor_name", TextRule::Trim),
        ColumnSpec::text("department_name", TextRule::Trim),
        ColumnSpec::text("specialization", TextRule::Trim),
        ColumnSpec::category("status", &DOCTOR_STATUSES)
            .with_policy(DefaultPolicy::ConstantFill(FillValue::Text("Active"))),
        ColumnSpec::decimal("years_experience")
            .with_policy(DefaultPolicy::ZeroFill)
            .with_bounds(Bounds::NON_NEGATIVE),
    ],
    derived: &[],
    dimension: Some(DimensionSpec {
        name: "dim_doctors",
        columns: &[
            "doctor_id",
            "doctor_name",
            "department_name",
            "specialization",
            "status",
            "years_experience",
        ],
    }),
};

static DEPARTMENT: EntitySchema = EntitySchema {
    entity: Entity::Department,
    key: "department_id",
    columns: &[
        ColumnSpec::integer("department_id"),
        ColumnSpec::text("department_name", TextRule::Trim),
        ColumnSpec::text("head_doctor", TextRule::Trim),
        ColumnSpec::integer("floor_number")
            .with_policy(DefaultPolicy::ZeroFill)
            .with_bounds(Bounds::NON_NEGATIVE),
    ],
    derived: &[],
    dimension: Some(DimensionSpec {
        name: "dim_departments",
        columns: &["department_id", "department_name", "head_doctor", "floor_number"],
    }),
};

static DIAGNOSIS: EntitySchema = EntitySchema {
    entity: Entity::Diagnosis,
    key: "diagnosis_code",
    columns: &[
        ColumnSpec::integer("diagnosis_id"),
        ColumnSpec::text("diagnosis_code", TextRule::UpperCase),
        ColumnSpec::text("diagnosis_name", TextRule::Trim),
    ],
    derived: &[],
    dimension: Some(DimensionSpec {
        name: "dim_diagnoses",
        columns: &["diagnosis_id", "diagnosis_name", "diagnosis_code"],
    }),
};

static DATE: EntitySchema = EntitySchema {
    entity: Entity::Date,
    key: "date_id",
    columns: &[ColumnSpec::date("date").with_policy(DefaultPolicy::DropRow)],
    derived: &["date_id", "year", "month", "day", "quarter", "day_name"],
    dimension: Some(DimensionSpec {
        name: "dim_dates",
        columns: &["date_id", "date", "year", "month", "day", "quarter", "day_name"],
    }),
};

static VISIT: EntitySchema = EntitySchema {
    entity: Entity::Visit,
    key: "visit_id",
    columns: &[
        ColumnSpec::integer("visit_id"),
        ColumnSpec::integer("patient_id"),
        ColumnSpec::integer("doctor_id"),
        ColumnSpec::text("department_name", TextRule::Trim),
        ColumnSpec::text("diagnosis_code", TextRule::UpperCase),
        ColumnSpec::date("visit_date"),
        ColumnSpec::category("visit_type", &VISIT_TYPES)
            .with_policy(DefaultPolicy::ConstantFill(FillValue::Text("Rawat Jalan"))),
        ColumnSpec::decimal("visit_duration_days")
            .with_policy(DefaultPolicy::ZeroFill)
            .with_bounds(Bounds::NON_NEGATIVE),
        ColumnSpec::decimal("total_cost")
            .with_policy(DefaultPolicy::ZeroFill)
            .with_bounds(Bounds::NON_NEGATIVE),
        ColumnSpec::decimal("insurance_coverage")
            .with_policy(DefaultPolicy::ZeroFill)
            .with_bounds(Bounds::NON_NEGATIVE),
        ColumnSpec::decimal("patient_payment").with_bounds(Bounds::NON_NEGATIVE),
        ColumnSpec::integer("satisfaction_rating")
            .rounded()
            .with_policy(DefaultPolicy::ConstantFill(FillValue::Int(3)))
            .with_bounds(Bounds::between(1.0, 5.0)),
    ],
    derived: &[],
    dimension: None,
};

pub fn schema_for(entity: Entity) -> &'static EntitySchema {
    match entity {
        Entity::Patient => &PATIENT,
        Entity::Doctor => &DOCTOR,
        Entity::Department => &DEPARTMENT,
        Entity::Diagnosis => &DIAGNOSIS,
        Entity::Date => &DATE,
        Entity::Visit => &VISIT,
    }
}

pub const FACT_TABLE: &str = "fact_visits";

/// Output column order of the fact table.
pub const FACT_COLUMNS: &[&str] = &[
    "visit_id",
    "patient_id",
    "doctor_id",
    "department_id",
    "diagnosis_id",
    "date_id",
    "visit_type",
    "visit_duration_days",
    "total_cost",
    "insurance_coverage",
    "patient_payment",
    "satisfaction_rating",
];

/// Visit columns the fact table cannot be resolved without.
pub const FACT_REQUIRED_COLUMNS: &[&str] = &["visit_id", "doctor_id", "diagnosis_code", "visit_date"];
