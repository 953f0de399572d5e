//! Built-in expression definitions, one module per family

pub mod access;
pub mod aggregative;
pub mod arithmetic;
pub mod comparative;
pub mod conditional;
pub mod generative;
pub mod iterative;
pub mod logical;
pub mod string;
pub mod temporal;

use super::ExpressionDef;

/// Every built-in definition
pub fn builtin() -> Vec<ExpressionDef> {
    let mut defs = Vec::new();
    defs.extend(access::definitions());
    defs.extend(comparative::definitions());
    defs.extend(logical::definitions());
    defs.extend(arithmetic::definitions());
    defs.extend(iterative::definitions());
    defs.extend(conditional::definitions());
    defs.extend(aggregative::definitions());
    defs.extend(generative::definitions());
    defs.extend(temporal::definitions());
    defs.extend(string::definitions());
    defs
}
