use std::collections::HashMap;
use std::sync::Arc;

use crate::common::TableOid;
use crate::tuple::{Schema, Value};

use super::expression::Expression;

/// Full scan of a table. Each output column is computed by the matching
/// expression over the stored tuple; the predicate filters projected rows.
pub struct SeqScanPlan {
    pub table_oid: TableOid,
    pub output_schema: Arc<Schema>,
    pub output_exprs: Vec<Expression>,
    pub predicate: Option<Expression>,
}

impl SeqScanPlan {
    /// Scan emitting the table's rows unchanged.
    pub fn full(table_oid: TableOid, schema: Arc<Schema>) -> Self {
        let output_exprs = (0..schema.column_count()).map(Expression::column).collect();
        Self {
            table_oid,
            output_schema: schema,
            output_exprs,
            predicate: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Expression) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

/// Insert rows into a table, either literal rows or the child's output.
pub struct InsertPlan {
    pub table_oid: TableOid,
    /// Literal rows for a raw insert; None when rows come from a child
    pub raw_values: Option<Vec<Vec<Value>>>,
}

impl InsertPlan {
    pub fn raw(table_oid: TableOid, raw_values: Vec<Vec<Value>>) -> Self {
        Self {
            table_oid,
            raw_values: Some(raw_values),
        }
    }

    pub fn from_child(table_oid: TableOid) -> Self {
        Self {
            table_oid,
            raw_values: None,
        }
    }

    pub fn is_raw_insert(&self) -> bool {
        self.raw_values.is_some()
    }
}

/// Delete every row the child produces.
pub struct DeletePlan {
    pub table_oid: TableOid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateType {
    /// Replace the column with the literal
    Set,
    /// Add the literal to the column
    Add,
}

/// Per-column update action.
#[derive(Debug, Clone, Copy)]
pub struct UpdateInfo {
    pub update_type: UpdateType,
    pub value: i32,
}

/// Update every row the child produces, rewriting the columns named in
/// `update_attrs` and keeping the rest.
pub struct UpdatePlan {
    pub table_oid: TableOid,
    pub update_attrs: HashMap<usize, UpdateInfo>,
}

/// Cross product of the children filtered by the join predicate.
pub struct NestedLoopJoinPlan {
    pub output_schema: Arc<Schema>,
    pub output_exprs: Vec<Expression>,
    pub predicate: Option<Expression>,
}

/// Equi-join: build a hash table over the left child's key, probe with the
/// right child's key.
pub struct HashJoinPlan {
    pub output_schema: Arc<Schema>,
    pub output_exprs: Vec<Expression>,
    pub left_key_expr: Expression,
    pub right_key_expr: Expression,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationType {
    Count,
    Sum,
    Min,
    Max,
}

/// Hash aggregation over the child, with optional grouping and a HAVING
/// filter evaluated per group.
pub struct AggregationPlan {
    pub output_schema: Arc<Schema>,
    pub output_exprs: Vec<Expression>,
    pub group_by_exprs: Vec<Expression>,
    pub aggregate_exprs: Vec<Expression>,
    pub agg_types: Vec<AggregationType>,
    pub having: Option<Expression>,
}
