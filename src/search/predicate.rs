//! Compiles a [`FilterSet`] into parameterized conditions.
//!
//! The same [`Predicate`] renders a SQL `WHERE` clause (values are always
//! bound, never interpolated) and evaluates in memory against a
//! [`Property`], so both store backends select identical rows.

use rust_decimal::Decimal;
use sqlx::{Postgres, QueryBuilder};

use super::filters::FilterSet;
use crate::models::Property;

/// Highest bedroom bucket offered by the filter UI ("4+").
pub const BEDROOMS_TOP_BUCKET: i32 = 4;
/// Highest suite bucket ("4+").
pub const SUITES_TOP_BUCKET: i32 = 4;
/// Highest bathroom bucket ("3+").
pub const BATHROOMS_TOP_BUCKET: i32 = 3;
/// Highest parking bucket ("3+").
pub const PARKING_TOP_BUCKET: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Category,
    Status,
    City,
    PropertyType,
    Neighborhood,
    /// Sale price, else rent price.
    ActivePrice,
    Bedrooms,
    Bathrooms,
    Suites,
    ParkingSpaces,
    Featured,
}

impl Field {
    pub fn column(&self) -> &'static str {
        match self {
            Field::Category => "category",
            Field::Status => "status",
            Field::City => "city",
            Field::PropertyType => "property_type",
            Field::Neighborhood => "neighborhood",
            Field::ActivePrice => "COALESCE(sale_price, rent_price)",
            Field::Bedrooms => "bedrooms",
            Field::Bathrooms => "bathrooms",
            Field::Suites => "suites",
            Field::ParkingSpaces => "parking_spaces",
            Field::Featured => "is_featured",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    AtLeast,
    AtMost,
    /// Case-insensitive substring.
    Contains,
}

impl Operator {
    fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => " = ",
            Operator::AtLeast => " >= ",
            Operator::AtMost => " <= ",
            Operator::Contains => " ILIKE ",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i32),
    Amount(Decimal),
    Flag(bool),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    fn new(field: Field, op: Operator, value: Value) -> Self {
        Self { field, op, value }
    }

    /// Room-style bucket: values below the top bucket match exactly, the top
    /// bucket (or anything above it) means "at least".
    fn bucket(field: Field, requested: i32, top: i32) -> Self {
        let op = if requested >= top {
            Operator::AtLeast
        } else {
            Operator::Eq
        };
        Self::new(field, op, Value::Integer(requested))
    }

    pub fn matches(&self, property: &Property) -> bool {
        match (&self.value, self.field) {
            (Value::Text(expected), field) => {
                let actual = match field {
                    Field::Category => Some(property.category.as_str()),
                    Field::Status => Some(property.status.as_str()),
                    Field::City => Some(property.city.as_str()),
                    Field::PropertyType => Some(property.property_type.as_str()),
                    Field::Neighborhood => property.neighborhood.as_deref(),
                    _ => None,
                };
                match (actual, self.op) {
                    (Some(actual), Operator::Contains) => {
                        actual.to_lowercase().contains(&expected.to_lowercase())
                    }
                    (Some(actual), Operator::Eq) => actual == expected,
                    _ => false,
                }
            }
            (Value::Integer(expected), field) => {
                let actual = match field {
                    Field::Bedrooms => property.bedrooms,
                    Field::Bathrooms => property.bathrooms,
                    Field::Suites => property.suites,
                    Field::ParkingSpaces => property.parking_spaces,
                    _ => return false,
                };
                compare(&actual, self.op, expected)
            }
            (Value::Amount(expected), Field::ActivePrice) => property
                .active_price()
                .map_or(false, |actual| compare(&actual, self.op, expected)),
            (Value::Flag(expected), Field::Featured) => property.is_featured == *expected,
            _ => false,
        }
    }

    fn push_sql(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        builder.push(self.field.column());
        builder.push(self.op.sql());
        match &self.value {
            Value::Text(text) if self.op == Operator::Contains => {
                builder.push_bind(format!("%{}%", escape_like(text)));
            }
            Value::Text(text) => {
                builder.push_bind(text.clone());
            }
            Value::Integer(n) => {
                builder.push_bind(*n);
            }
            Value::Amount(amount) => {
                builder.push_bind(*amount);
            }
            Value::Flag(flag) => {
                builder.push_bind(*flag);
            }
        }
    }
}

fn compare<T: PartialOrd>(actual: &T, op: Operator, expected: &T) -> bool {
    match op {
        Operator::Eq => actual == expected,
        Operator::AtLeast => actual >= expected,
        Operator::AtMost => actual <= expected,
        Operator::Contains => false,
    }
}

/// Escapes `LIKE` metacharacters so user input only ever matches literally.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Conjunction of conditions. Empty matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
    conditions: Vec<Condition>,
}

impl Predicate {
    pub fn compile(filters: &FilterSet) -> Self {
        let mut conditions = Vec::new();

        if let Some(category) = filters.category {
            conditions.push(Condition::new(
                Field::Category,
                Operator::Eq,
                Value::Text(category.as_str().to_string()),
            ));
        }
        if let Some(status) = filters.status {
            conditions.push(Condition::new(
                Field::Status,
                Operator::Eq,
                Value::Text(status.as_str().to_string()),
            ));
        }
        if let Some(city) = &filters.city {
            conditions.push(Condition::new(Field::City, Operator::Eq, Value::Text(city.clone())));
        }
        if let Some(property_type) = &filters.property_type {
            conditions.push(Condition::new(
                Field::PropertyType,
                Operator::Eq,
                Value::Text(property_type.clone()),
            ));
        }
        if let Some(neighborhood) = &filters.neighborhood {
            conditions.push(Condition::new(
                Field::Neighborhood,
                Operator::Contains,
                Value::Text(neighborhood.clone()),
            ));
        }
        if let Some(min) = filters.price_min {
            conditions.push(Condition::new(Field::ActivePrice, Operator::AtLeast, Value::Amount(min)));
        }
        if let Some(max) = filters.price_max {
            conditions.push(Condition::new(Field::ActivePrice, Operator::AtMost, Value::Amount(max)));
        }
        if let Some(n) = filters.bedrooms {
            conditions.push(Condition::bucket(Field::Bedrooms, n, BEDROOMS_TOP_BUCKET));
        }
        if let Some(n) = filters.bathrooms {
            conditions.push(Condition::bucket(Field::Bathrooms, n, BATHROOMS_TOP_BUCKET));
        }
        if let Some(n) = filters.suites {
            conditions.push(Condition::bucket(Field::Suites, n, SUITES_TOP_BUCKET));
        }
        if let Some(n) = filters.parking_spaces {
            conditions.push(Condition::bucket(Field::ParkingSpaces, n, PARKING_TOP_BUCKET));
        }
        if let Some(featured) = filters.featured {
            conditions.push(Condition::new(Field::Featured, Operator::Eq, Value::Flag(featured)));
        }

        Self { conditions }
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Bound parameter values in placeholder order (`$1`, `$2`, ...).
    pub fn bound_values(&self) -> Vec<&Value> {
        self.conditions.iter().map(|c| &c.value).collect()
    }

    pub fn matches(&self, property: &Property) -> bool {
        self.conditions.iter().all(|c| c.matches(property))
    }

    /// Appends ` WHERE a AND b ...` to `builder`; nothing when empty.
    pub fn push_where(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        for (i, condition) in self.conditions.iter().enumerate() {
            builder.push(if i == 0 { " WHERE " } else { " AND " });
            condition.push_sql(builder);
        }
    }
}
