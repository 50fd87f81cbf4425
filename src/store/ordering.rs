//! Total ordering over BSON values
//!
//! Follows MongoDB's comparison order: values are first ranked by type
//! bracket (MinKey, null, numbers, strings, documents, arrays, binary,
//! ObjectId, booleans, dates, timestamps, regexes, MaxKey) and then compared
//! within the bracket. Numbers compare across int/long/double.

use bson::Bson;
use std::cmp::Ordering;

use super::{Cursor, Direction};

/// Type bracket of a value
pub fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::MinKey => 0,
        Bson::Null | Bson::Undefined => 1,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) | Bson::Decimal128(_) => 2,
        Bson::String(_) | Bson::Symbol(_) => 3,
        Bson::Document(_) => 4,
        Bson::Array(_) => 5,
        Bson::Binary(_) => 6,
        Bson::ObjectId(_) => 7,
        Bson::Boolean(_) => 8,
        Bson::DateTime(_) => 9,
        Bson::Timestamp(_) => 10,
        Bson::RegularExpression(_) => 11,
        Bson::MaxKey => 13,
        _ => 12,
    }
}

/// Compare two values under MongoDB's ordering
pub fn compare_values(a: &Bson, b: &Bson) -> Ordering {
    let rank = type_rank(a).cmp(&type_rank(b));
    if rank != Ordering::Equal {
        return rank;
    }

    match (a, b) {
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            as_i64(a).cmp(&as_i64(b))
        }
        (Bson::String(x) | Bson::Symbol(x), Bson::String(y) | Bson::Symbol(y)) => x.cmp(y),
        (Bson::Document(x), Bson::Document(y)) => {
            for ((kx, vx), (ky, vy)) in x.iter().zip(y.iter()) {
                let ord = kx.cmp(ky).then_with(|| compare_values(vx, vy));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Array(x), Bson::Array(y)) => {
            for (vx, vy) in x.iter().zip(y.iter()) {
                let ord = compare_values(vx, vy);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Bson::Binary(x), Bson::Binary(y)) => x
            .bytes
            .len()
            .cmp(&y.bytes.len())
            .then_with(|| u8::from(x.subtype).cmp(&u8::from(y.subtype)))
            .then_with(|| x.bytes.cmp(&y.bytes)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.timestamp_millis().cmp(&y.timestamp_millis()),
        (Bson::Timestamp(x), Bson::Timestamp(y)) => {
            (x.time, x.increment).cmp(&(y.time, y.increment))
        }
        (Bson::RegularExpression(x), Bson::RegularExpression(y)) => {
            (&x.pattern, &x.options).cmp(&(&y.pattern, &y.options))
        }
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            _ => Ordering::Equal,
        },
    }
}

/// Compare two document positions: order value first, key as tie-breaker
pub fn compare_positions(a: &Cursor, b: &Cursor) -> Ordering {
    compare_values(&a.value, &b.value).then_with(|| compare_values(&a.key, &b.key))
}

/// Compare two positions as they appear under `direction`
pub fn compare_directed(a: &Cursor, b: &Cursor, direction: Direction) -> Ordering {
    match direction {
        Direction::Asc => compare_positions(a, b),
        Direction::Desc => compare_positions(a, b).reverse(),
    }
}

fn as_i64(value: &Bson) -> i64 {
    match value {
        Bson::Int32(v) => i64::from(*v),
        Bson::Int64(v) => *v,
        _ => 0,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        Bson::Decimal128(d) => d.to_string().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{DateTime, Decimal128, doc};

    fn decimal(text: &str) -> Bson {
        Bson::Decimal128(text.parse::<Decimal128>().unwrap())
    }

    #[test]
    fn test_type_brackets() {
        assert_eq!(compare_values(&Bson::Null, &Bson::Int32(0)), Ordering::Less);
        assert_eq!(
            compare_values(&Bson::Int64(1_000), &Bson::String("1".into())),
            Ordering::Less
        );
        assert_eq!(
            compare_values(&Bson::Boolean(false), &Bson::DateTime(DateTime::from_millis(0))),
            Ordering::Less
        );
        assert_eq!(compare_values(&Bson::MaxKey, &Bson::Boolean(true)), Ordering::Greater);
    }

    #[test]
    fn test_numbers_compare_across_types() {
        assert_eq!(compare_values(&Bson::Int32(2), &Bson::Int64(2)), Ordering::Equal);
        assert_eq!(compare_values(&Bson::Int32(2), &Bson::Double(2.5)), Ordering::Less);
        assert_eq!(compare_values(&Bson::Double(-1.0), &Bson::Int64(-2)), Ordering::Greater);
    }

    #[test]
    fn test_decimals_compare_by_value() {
        assert_eq!(compare_values(&decimal("10"), &decimal("30")), Ordering::Less);
        assert_eq!(compare_values(&decimal("20.5"), &Bson::Int32(20)), Ordering::Greater);
        assert_eq!(compare_values(&decimal("2.5"), &Bson::Double(2.5)), Ordering::Equal);
        assert_eq!(compare_values(&decimal("-1"), &Bson::Int64(0)), Ordering::Less);
    }

    #[test]
    fn test_documents_and_arrays() {
        let a = Bson::Document(doc! { "a": 1 });
        let b = Bson::Document(doc! { "a": 1, "b": 0 });
        assert_eq!(compare_values(&a, &b), Ordering::Less);

        let x = Bson::Array(vec![Bson::Int32(1), Bson::Int32(3)]);
        let y = Bson::Array(vec![Bson::Int32(1), Bson::Int32(2)]);
        assert_eq!(compare_values(&x, &y), Ordering::Greater);
    }

    #[test]
    fn test_key_breaks_ties() {
        let a = Cursor::new("2024-04-20", "a");
        let b = Cursor::new("2024-04-20", "b");
        assert_eq!(compare_positions(&a, &b), Ordering::Less);
        assert_eq!(compare_directed(&a, &b, Direction::Desc), Ordering::Greater);
    }
}
