use pest::iterators::Pair;

use super::token::ExprToken;
use super::Rule;
use crate::error::TranslationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum UnaryKind {
    Neg,
    Not,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum BinKind {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum LogKind {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CompareKind {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Debug)]
pub(super) enum ExprNode {
    Var(String),
    Int(i32),
    StrLen(usize),
    Unary(UnaryKind, Box<ExprNode>),
    Binary(BinKind, Box<ExprNode>, Box<ExprNode>),
    Logical(LogKind, Box<ExprNode>, Box<ExprNode>),
    Compare(CompareKind, Box<ExprNode>, Box<ExprNode>),
}

/// Flatten the tree into a postfix token stream. Binary arithmetic and
/// comparisons push their *right* subtree before their *left* (matching the
/// reference parser's `visit_BinOp`/`visit_Compare` traversal), so that after
/// lowering, the left operand ends up in the accumulator and the right
/// operand sits at `sp - 2`. Logical AND/OR push left-then-right: both
/// operands are unconditionally evaluated before the short-circuit-shaped
/// reduction runs, so push order does not affect the result, only which
/// operand the reduction inspects first.
pub(super) fn flatten(node: &ExprNode, out: &mut Vec<ExprToken>) {
    match node {
        ExprNode::Var(name) => out.push(ExprToken::VarRef(name.clone())),
        ExprNode::Int(v) => out.push(ExprToken::IntConst(*v)),
        ExprNode::StrLen(n) => out.push(ExprToken::StrLenConst(*n)),
        ExprNode::Unary(UnaryKind::Neg, inner) => {
            flatten(inner, out);
            out.push(ExprToken::Neg);
        }
        ExprNode::Unary(UnaryKind::Not, inner) => {
            flatten(inner, out);
            out.push(ExprToken::Not);
        }
        ExprNode::Binary(kind, left, right) => {
            flatten(right, out);
            flatten(left, out);
            out.push(match kind {
                BinKind::Add => ExprToken::Add,
                BinKind::Sub => ExprToken::Sub,
                BinKind::Mul => ExprToken::Mul,
                BinKind::Div => ExprToken::Div,
                BinKind::Mod => ExprToken::Mod,
            });
        }
        ExprNode::Logical(kind, left, right) => {
            flatten(left, out);
            flatten(right, out);
            out.push(match kind {
                LogKind::And => ExprToken::And,
                LogKind::Or => ExprToken::Or,
            });
        }
        ExprNode::Compare(kind, left, right) => {
            flatten(right, out);
            flatten(left, out);
            out.push(match kind {
                CompareKind::Eq => ExprToken::Eq,
                CompareKind::Ne => ExprToken::Ne,
                CompareKind::Lt => ExprToken::Lt,
                CompareKind::Le => ExprToken::Le,
                CompareKind::Gt => ExprToken::Gt,
                CompareKind::Ge => ExprToken::Ge,
            });
        }
    }
}

pub(super) fn build_or(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner();
    let mut node = build_and(inner.next().expect("or_expr has at least one and_expr"))?;
    while inner.next().is_some() {
        let rhs = build_and(inner.next().expect("or_op is followed by an and_expr"))?;
        node = ExprNode::Logical(LogKind::Or, Box::new(node), Box::new(rhs));
    }
    Ok(node)
}

fn build_and(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner();
    let mut node = build_compare(inner.next().expect("and_expr has at least one compare_expr"))?;
    while inner.next().is_some() {
        let rhs = build_compare(inner.next().expect("and_op is followed by a compare_expr"))?;
        node = ExprNode::Logical(LogKind::And, Box::new(node), Box::new(rhs));
    }
    Ok(node)
}

fn build_compare(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner();
    let left = build_additive(inner.next().expect("compare_expr has at least one additive"))?;
    let Some(op) = inner.next() else {
        return Ok(left);
    };
    let right = build_additive(inner.next().expect("compare_op is followed by an additive"))?;
    let kind = match op.as_rule() {
        Rule::eq_op => CompareKind::Eq,
        Rule::ne_op => CompareKind::Ne,
        Rule::lt_op => CompareKind::Lt,
        Rule::le_op => CompareKind::Le,
        Rule::gt_op => CompareKind::Gt,
        Rule::ge_op => CompareKind::Ge,
        other => unreachable!("unexpected comparison rule: {other:?}"),
    };
    Ok(ExprNode::Compare(kind, Box::new(left), Box::new(right)))
}

fn build_additive(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner();
    let mut node = build_term(inner.next().expect("additive has at least one term"))?;
    loop {
        let Some(op) = inner.next() else { break };
        let rhs = build_term(inner.next().expect("add_op/sub_op is followed by a term"))?;
        let kind = match op.as_rule() {
            Rule::add_op => BinKind::Add,
            Rule::sub_op => BinKind::Sub,
            other => unreachable!("unexpected additive rule: {other:?}"),
        };
        node = ExprNode::Binary(kind, Box::new(node), Box::new(rhs));
    }
    Ok(node)
}

fn build_term(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner();
    let mut node = build_unary(inner.next().expect("term has at least one unary"))?;
    loop {
        let Some(op) = inner.next() else { break };
        let rhs = build_unary(inner.next().expect("mul_op/div_op/mod_op is followed by a unary"))?;
        let kind = match op.as_rule() {
            Rule::mul_op => BinKind::Mul,
            Rule::div_op => BinKind::Div,
            Rule::mod_op => BinKind::Mod,
            other => unreachable!("unexpected term rule: {other:?}"),
        };
        node = ExprNode::Binary(kind, Box::new(node), Box::new(rhs));
    }
    Ok(node)
}

fn build_unary(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    let mut inner = pair.into_inner().peekable();
    let mut prefixes = Vec::new();
    while let Some(rule) = inner.peek().map(|p| p.as_rule()) {
        match rule {
            Rule::neg_op | Rule::pos_op | Rule::not_op => {
                prefixes.push(rule);
                inner.next();
            }
            _ => break,
        }
    }
    let primary = inner.next().expect("unary has exactly one primary");
    let mut node = build_primary(primary)?;
    for rule in prefixes.into_iter().rev() {
        node = match rule {
            Rule::neg_op => ExprNode::Unary(UnaryKind::Neg, Box::new(node)),
            Rule::pos_op => node,
            Rule::not_op => ExprNode::Unary(UnaryKind::Not, Box::new(node)),
            _ => unreachable!(),
        };
    }
    Ok(node)
}

fn build_primary(pair: Pair<Rule>) -> Result<ExprNode, TranslationError> {
    match pair.as_rule() {
        Rule::ident => Ok(ExprNode::Var(pair.as_str().to_string())),
        Rule::int_const => {
            let text = pair.as_str();
            let value: i64 = text
                .parse()
                .map_err(|_| TranslationError::InvalidExpression(text.to_string()))?;
            let bounded = i32::try_from(value).map_err(|_| TranslationError::IntegerOutOfRange(value))?;
            Ok(ExprNode::Int(bounded))
        }
        Rule::string_const => {
            let inner = pair
                .into_inner()
                .next()
                .expect("string_const always wraps a string_inner");
            Ok(ExprNode::StrLen(inner.as_str().chars().count()))
        }
        Rule::or_expr => build_or(pair),
        other => unreachable!("unexpected primary rule: {other:?}"),
    }
}
