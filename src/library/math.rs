use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::interpreter::cps::printer::print;
use crate::interpreter::cps::{CallContext, NativeFn, RuntimeError, Value};
use crate::{match_args, runtime_error};

macro_rules! unary {
    ($fn_name:ident, $name:expr, $op:expr) => {
        fn $fn_name(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
            let op: fn(f64) -> f64 = $op;
            match_args!($name, args, [x] => Value::Number(op(x.as_number()?)))
        }
    };
}

unary!(abs, "abs", f64::abs);
unary!(floor, "floor", f64::floor);
unary!(ceil, "ceil", f64::ceil);
unary!(round, "round", f64::round);
unary!(sqrt, "sqrt", f64::sqrt);
unary!(sin, "sin", f64::sin);
unary!(cos, "cos", f64::cos);
unary!(tan, "tan", f64::tan);

fn pow(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("pow", args, [base, exp] => Value::Number(base.as_number()?.powf(exp.as_number()?)))
}

fn atan2(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("atan2", args, [y, x] => Value::Number(y.as_number()?.atan2(x.as_number()?)))
}

fn extreme(name: &str, args: Vec<Value>, pick: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    let mut numbers = args.iter().map(Value::as_number);
    let first = match numbers.next() {
        Some(n) => n?,
        None => runtime_error!(Bind, "Wrong number of arguments to {}: 0", name),
    };
    numbers.try_fold(first, |acc, n| Ok(pick(acc, n?))).map(Value::Number)
}

fn min(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { extreme("min", args, f64::min) }

fn max(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> { extreme("max", args, f64::max) }

fn seed_of(x: &Value) -> u64 {
    match x {
        Value::Number(n) => n.to_bits(),
        other => print(other).bytes().fold(0xcbf2_9ce4_8422_2325, |hash, b| (hash ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)),
    }
}

/// (rnd seed): a number in [0, 1) fixed by the seed
fn rnd(_ctx: &CallContext<'_>, args: Vec<Value>) -> Result<Value, RuntimeError> {
    match_args!("rnd", args, [seed] => Value::Number(StdRng::seed_from_u64(seed_of(seed)).gen::<f64>()))
}

pub const EXPORTS: &[(&str, NativeFn)] = &[
    ("abs", abs),
    ("floor", floor),
    ("ceil", ceil),
    ("round", round),
    ("sqrt", sqrt),
    ("pow", pow),
    ("sin", sin),
    ("cos", cos),
    ("tan", tan),
    ("atan2", atan2),
    ("min", min),
    ("max", max),
    ("rnd", rnd),
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpreter::cps::{ErrorKind, Interpreter};

    #[test]
    fn test_extremes() {
        let rt = Interpreter::bare();
        let ctx = CallContext { rt: &rt, caller: None };
        let args = vec![Value::Number(3.0), Value::Number(-1.0), Value::Number(2.0)];
        assert_eq!(min(&ctx, args.clone()).unwrap(), Value::Number(-1.0));
        assert_eq!(max(&ctx, args).unwrap(), Value::Number(3.0));
        assert_eq!(max(&ctx, vec![]).unwrap_err().kind, ErrorKind::Bind);
        assert_eq!(max(&ctx, vec![Value::Nil]).unwrap_err().kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_rounding() {
        let rt = Interpreter::bare();
        let ctx = CallContext { rt: &rt, caller: None };
        assert_eq!(round(&ctx, vec![Value::Number(2.5)]).unwrap(), Value::Number(3.0));
        assert_eq!(floor(&ctx, vec![Value::Number(-0.5)]).unwrap(), Value::Number(-1.0));
    }

    #[test]
    fn test_rnd_is_fixed_by_seed() {
        let rt = Interpreter::bare();
        let ctx = CallContext { rt: &rt, caller: None };
        let a = rnd(&ctx, vec![Value::Number(7.0)]).unwrap().as_number().unwrap();
        let b = rnd(&ctx, vec![Value::Number(7.0)]).unwrap().as_number().unwrap();
        let c = rnd(&ctx, vec![Value::string("seed")]).unwrap().as_number().unwrap();
        assert_eq!(a, b);
        assert!((0.0..1.0).contains(&a));
        assert!((0.0..1.0).contains(&c));
        assert_ne!(a, rnd(&ctx, vec![Value::Number(8.0)]).unwrap().as_number().unwrap());
    }
}
