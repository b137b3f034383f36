//! Declarative interval filters handed to the report host.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{
  Deserialize,
  Serialize
};

use crate::error::{
  RangeError,
  Result
};
use crate::range::ResolvedRange;

pub const DEFAULT_DATE_ROLE: &str =
  "Time";

const ISO_MILLIS: &str =
  "%Y-%m-%dT%H:%M:%S%.3f";

/// A column as the host describes it: `Table.Column` plus its roles.
#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct FieldDescriptor {
  pub query_name: String,
  #[serde(default)]
  pub roles:      BTreeMap<String, bool>
}

impl FieldDescriptor {
  pub fn new(
    query_name: impl Into<String>,
    roles: &[&str]
  ) -> Self {
    Self {
      query_name: query_name.into(),
      roles:      roles
        .iter()
        .map(|role| {
          (role.to_string(), true)
        })
        .collect()
    }
  }

  pub fn has_role(
    &self,
    role: &str
  ) -> bool {
    self
      .roles
      .get(role)
      .copied()
      .unwrap_or(false)
  }

  /// Splits `Table.Column` at the first dot; a bare name has no table.
  pub fn target(&self) -> FilterTarget {
    match self.query_name.split_once('.')
    {
      | Some((table, column)) => {
        FilterTarget {
          table:  table.to_string(),
          column: column.to_string()
        }
      }
      | None => FilterTarget {
        table:  String::new(),
        column: self.query_name.clone()
      }
    }
  }
}

/// First column bound to `role`.
pub fn find_date_field<'a>(
  columns: &'a [FieldDescriptor],
  role: &str
) -> Result<&'a FieldDescriptor> {
  columns
    .iter()
    .find(|col| col.has_role(role))
    .ok_or_else(|| {
      RangeError::EmptyOrMissingDateField(
        role.to_string()
      )
    })
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct FilterTarget {
  pub table:  String,
  pub column: String
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub enum ConditionOperator {
  GreaterThanOrEqual,
  LessThanOrEqual
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
pub struct Condition {
  pub operator: ConditionOperator,
  pub value:    String
}

#[derive(
  Debug,
  Clone,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct IntervalFilter {
  pub target:           FilterTarget,
  pub logical_operator: String,
  pub conditions:       Vec<Condition>
}

impl IntervalFilter {
  /// Inclusive `[start, end]` over `field`.
  pub fn between(
    field: &FieldDescriptor,
    start: NaiveDateTime,
    end: NaiveDateTime
  ) -> Self {
    Self {
      target:           field.target(),
      logical_operator: "And".to_string(),
      conditions:       vec![
        Condition {
          operator: ConditionOperator::GreaterThanOrEqual,
          value:    iso_instant(start)
        },
        Condition {
          operator: ConditionOperator::LessThanOrEqual,
          value:    iso_instant(end)
        },
      ]
    }
  }

  pub fn for_range(
    field: &FieldDescriptor,
    range: &ResolvedRange
  ) -> Self {
    Self::between(
      field,
      range.start_date(),
      range.end_date()
    )
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FilterAction {
  Merge,
  Remove
}

/// `Merge` only when both bounds are known.
pub fn filter_action(
  start: Option<NaiveDateTime>,
  end: Option<NaiveDateTime>
) -> FilterAction {
  if start.is_some() && end.is_some() {
    FilterAction::Merge
  } else {
    FilterAction::Remove
  }
}

/// `YYYY-MM-DDTHH:MM:SS.mmm`, local calendar time.
pub fn iso_instant(
  instant: NaiveDateTime
) -> String {
  instant.format(ISO_MILLIS).to_string()
}
