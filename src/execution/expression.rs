use std::cmp::Ordering;

use crate::tuple::{Tuple, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

/// Scalar expression evaluated against operator input rows. Join operators
/// evaluate with two input tuples (`tuple_idx` 0 = left, 1 = right);
/// aggregation evaluates against the per-group `(group_bys, aggregates)`
/// vectors instead of a tuple.
#[derive(Debug, Clone)]
pub enum Expression {
    /// A column of an input tuple
    ColumnValue { tuple_idx: usize, col_idx: usize },
    /// A literal
    Constant(Value),
    /// Comparison yielding a boolean; incomparable operands yield false
    Comparison {
        op: ComparisonOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// The i-th group-by term of an aggregation
    GroupBy(usize),
    /// The i-th aggregate accumulator of an aggregation
    Aggregate(usize),
}

impl Expression {
    pub fn column(col_idx: usize) -> Self {
        Expression::ColumnValue {
            tuple_idx: 0,
            col_idx,
        }
    }

    pub fn join_column(tuple_idx: usize, col_idx: usize) -> Self {
        Expression::ColumnValue { tuple_idx, col_idx }
    }

    pub fn constant(value: impl Into<Value>) -> Self {
        Expression::Constant(value.into())
    }

    pub fn comparison(op: ComparisonOp, left: Expression, right: Expression) -> Self {
        Expression::Comparison {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Evaluates against a single input row.
    pub fn evaluate(&self, tuple: &Tuple) -> Value {
        match self {
            Expression::ColumnValue { col_idx, .. } => {
                tuple.value(*col_idx).cloned().unwrap_or(Value::Null)
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => {
                compare(*op, &left.evaluate(tuple), &right.evaluate(tuple))
            }
            Expression::GroupBy(_) | Expression::Aggregate(_) => Value::Null,
        }
    }

    /// Evaluates against a pair of join input rows.
    pub fn evaluate_join(&self, left_tuple: &Tuple, right_tuple: &Tuple) -> Value {
        match self {
            Expression::ColumnValue { tuple_idx, col_idx } => {
                let tuple = if *tuple_idx == 0 { left_tuple } else { right_tuple };
                tuple.value(*col_idx).cloned().unwrap_or(Value::Null)
            }
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => compare(
                *op,
                &left.evaluate_join(left_tuple, right_tuple),
                &right.evaluate_join(left_tuple, right_tuple),
            ),
            Expression::GroupBy(_) | Expression::Aggregate(_) => Value::Null,
        }
    }

    /// Evaluates against one aggregation group.
    pub fn evaluate_aggregate(&self, group_bys: &[Value], aggregates: &[Value]) -> Value {
        match self {
            Expression::GroupBy(i) => group_bys.get(*i).cloned().unwrap_or(Value::Null),
            Expression::Aggregate(i) => aggregates.get(*i).cloned().unwrap_or(Value::Null),
            Expression::Constant(value) => value.clone(),
            Expression::Comparison { op, left, right } => compare(
                *op,
                &left.evaluate_aggregate(group_bys, aggregates),
                &right.evaluate_aggregate(group_bys, aggregates),
            ),
            Expression::ColumnValue { .. } => Value::Null,
        }
    }
}

fn compare(op: ComparisonOp, left: &Value, right: &Value) -> Value {
    let result = match left.compare(right) {
        Some(ordering) => match op {
            ComparisonOp::Equal => ordering == Ordering::Equal,
            ComparisonOp::NotEqual => ordering != Ordering::Equal,
            ComparisonOp::LessThan => ordering == Ordering::Less,
            ComparisonOp::LessThanOrEqual => ordering != Ordering::Greater,
            ComparisonOp::GreaterThan => ordering == Ordering::Greater,
            ComparisonOp::GreaterThanOrEqual => ordering != Ordering::Less,
        },
        None => false,
    };
    Value::Boolean(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tuple::{DataType, Schema};
    use std::sync::Arc;

    fn sample_tuple() -> Tuple {
        let schema = Schema::shared(vec![("a", DataType::Integer), ("b", DataType::Integer)]);
        Tuple::new(schema, vec![Value::Integer(3), Value::Integer(8)])
    }

    #[test]
    fn test_column_and_constant() {
        let tuple = sample_tuple();
        assert_eq!(Expression::column(1).evaluate(&tuple), Value::Integer(8));
        assert_eq!(
            Expression::constant(5).evaluate(&tuple),
            Value::Integer(5)
        );
        assert_eq!(Expression::column(9).evaluate(&tuple), Value::Null);
    }

    #[test]
    fn test_comparison() {
        let tuple = sample_tuple();
        let expr = Expression::comparison(
            ComparisonOp::LessThan,
            Expression::column(0),
            Expression::constant(5),
        );
        assert!(expr.evaluate(&tuple).is_true());

        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::column(0),
            Expression::column(1),
        );
        assert!(!expr.evaluate(&tuple).is_true());
    }

    #[test]
    fn test_null_comparison_is_false() {
        let tuple = sample_tuple();
        let expr = Expression::comparison(
            ComparisonOp::Equal,
            Expression::constant(Value::Null),
            Expression::column(0),
        );
        assert!(!expr.evaluate(&tuple).is_true());
    }

    #[test]
    fn test_evaluate_join_picks_side() {
        let left = sample_tuple();
        let right_schema = Schema::shared(vec![("c", DataType::Integer)]);
        let right = Tuple::new(right_schema, vec![Value::Integer(42)]);

        assert_eq!(
            Expression::join_column(0, 0).evaluate_join(&left, &right),
            Value::Integer(3)
        );
        assert_eq!(
            Expression::join_column(1, 0).evaluate_join(&left, &right),
            Value::Integer(42)
        );
    }

    #[test]
    fn test_evaluate_aggregate() {
        let group_bys = vec![Value::Integer(1)];
        let aggregates = vec![Value::Integer(4), Value::Integer(8)];

        assert_eq!(
            Expression::GroupBy(0).evaluate_aggregate(&group_bys, &aggregates),
            Value::Integer(1)
        );
        assert_eq!(
            Expression::Aggregate(1).evaluate_aggregate(&group_bys, &aggregates),
            Value::Integer(8)
        );
    }
}
