//! 条件表达式求值
//!
//! 每个条件是一个三元组 `(operator, field, expected)`，对请求上下文中 `field`
//! 字段的实际值求值。求值是全函数：任何错误输入都只会得到 `false`。
//!
//! 正则和谓词在构造条件时编译一次，随条件（以及所属规则）一起释放。

pub mod predicate;

pub use predicate::{ExprError, Function, Predicate};

use crate::metrics::METRICS;
use crate::r#const::{condition_error_labels, expr};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 请求上下文：查询参数、请求头以及客户端地址
pub type RequestContext = HashMap<String, String>;

/// 条件操作符
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operator {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    In,
    Nin,
    Regex,
    Predicate,
    /// 未知操作符，保留原名，求值恒为 false
    Unsupported(String),
}

impl Operator {
    /// 配置中使用的名称
    pub fn as_str(&self) -> &str {
        match self {
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::In => "in",
            Operator::Nin => "nin",
            Operator::Regex => "regex",
            Operator::Predicate => "predicate",
            Operator::Unsupported(name) => name.as_str(),
        }
    }
}

impl From<&str> for Operator {
    fn from(name: &str) -> Self {
        // 兼容旧配置中的 `$in` 写法
        let bare = name.strip_prefix(expr::OPERATOR_PREFIX).unwrap_or(name);
        match bare {
            "gt" => Operator::Gt,
            "gte" => Operator::Gte,
            "lt" => Operator::Lt,
            "lte" => Operator::Lte,
            "eq" => Operator::Eq,
            "neq" => Operator::Neq,
            "in" => Operator::In,
            "nin" => Operator::Nin,
            "regex" => Operator::Regex,
            "predicate" | "lambda" => Operator::Predicate,
            _ => Operator::Unsupported(name.to_string()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// 条件构造时预编译的匹配器，编译失败记为 None，求值恒为 false
#[derive(Debug, Clone)]
enum Matcher {
    Plain,
    Regex(Option<Regex>),
    Predicate(Option<Arc<Predicate>>),
}

impl Matcher {
    fn compile(operator: &Operator, expected: &str) -> Self {
        match operator {
            Operator::Regex => Matcher::Regex(compile_regex(expected)),
            Operator::Predicate => Matcher::Predicate(parse_predicate(expected)),
            _ => Matcher::Plain,
        }
    }
}

/// 单个调度条件
///
/// 字段只读，保证预编译的匹配器与期望值一致。相等比较只看三元组本身。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "ConditionRepr", into = "ConditionRepr")]
pub struct Condition {
    operator: Operator,
    field: String,
    expected: String,
    matcher: Matcher,
}

impl Condition {
    pub fn new(
        operator: impl Into<Operator>,
        field: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        let operator = operator.into();
        let expected = expected.into();
        let matcher = Matcher::compile(&operator, &expected);
        Self {
            operator,
            field: field.into(),
            expected,
            matcher,
        }
    }

    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    /// 对请求上下文求值
    pub fn matches(&self, context: &RequestContext) -> bool {
        let actual = context.get(&self.field).map(String::as_str);
        evaluate_with(&self.operator, actual, &self.expected, &self.matcher)
    }
}

impl PartialEq for Condition {
    fn eq(&self, other: &Self) -> bool {
        self.operator == other.operator
            && self.field == other.field
            && self.expected == other.expected
    }
}

impl Eq for Condition {}

// 条件的持久化形式: [operator, field, expected]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConditionRepr(String, String, serde_json::Value);

impl From<ConditionRepr> for Condition {
    fn from(ConditionRepr(operator, field, expected): ConditionRepr) -> Self {
        Condition::new(Operator::from(operator.as_str()), field, literal_text(&expected))
    }
}

impl From<Condition> for ConditionRepr {
    fn from(condition: Condition) -> Self {
        ConditionRepr(
            condition.operator.as_str().to_string(),
            condition.field,
            serde_json::Value::String(condition.expected),
        )
    }
}

// 将配置中的字面量统一转换为字符串
fn literal_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => expr::ABSENT_LITERAL.to_string(),
        // 列表写法等价于逗号分隔的字符串
        serde_json::Value::Array(items) => items
            .iter()
            .map(literal_text)
            .collect::<Vec<_>>()
            .join(&expr::LIST_SEPARATOR.to_string()),
        other => other.to_string(),
    }
}

// 解析数值，两侧空白忽略，只接受有限值
pub(crate) fn parse_number(value: &str) -> Option<f64> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|number| number.is_finite())
}

// 记录求值失败
fn record_failure(reason: &str, operator: &Operator, detail: &str) {
    debug!(
        "Condition evaluation failed: operator={}, reason={}, detail={}",
        operator, reason, detail
    );
    METRICS
        .condition_failures_total()
        .with_label_values(&[reason])
        .inc();
}

// 数值比较
fn compare_numeric(operator: &Operator, actual: Option<&str>, expected: &str) -> bool {
    let Some(actual) = actual else {
        return false;
    };

    let (lhs, rhs) = match (parse_number(actual), parse_number(expected)) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        _ => {
            record_failure(
                condition_error_labels::NOT_NUMERIC,
                operator,
                &format!("{:?} vs {:?}", actual, expected),
            );
            return false;
        }
    };

    match operator {
        Operator::Gt => lhs > rhs,
        Operator::Gte => lhs >= rhs,
        Operator::Lt => lhs < rhs,
        Operator::Lte => lhs <= rhs,
        _ => false,
    }
}

// 编译正则表达式
fn compile_regex(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern)
        .size_limit(expr::REGEX_SIZE_LIMIT)
        .build()
    {
        Ok(regex) => Some(regex),
        Err(e) => {
            record_failure(condition_error_labels::BAD_REGEX, &Operator::Regex, &e.to_string());
            None
        }
    }
}

// 解析谓词
fn parse_predicate(source: &str) -> Option<Arc<Predicate>> {
    match Predicate::parse(source) {
        Ok(predicate) => Some(Arc::new(predicate)),
        Err(e) => {
            record_failure(
                condition_error_labels::BAD_PREDICATE,
                &Operator::Predicate,
                &e.to_string(),
            );
            None
        }
    }
}

/// 对单个条件求值
///
/// `actual` 为 `None` 表示请求上下文中不存在该字段：相等与成员判断按字面值
/// `"None"` 参与比较，数值、正则和谓词判断直接返回 `false`。
///
/// 正则和谓词每次调用都重新编译，规则匹配应使用 [`Condition::matches`]。
pub fn evaluate(operator: &Operator, actual: Option<&str>, expected: &str) -> bool {
    let matcher = Matcher::compile(operator, expected);
    evaluate_with(operator, actual, expected, &matcher)
}

fn evaluate_with(
    operator: &Operator,
    actual: Option<&str>,
    expected: &str,
    matcher: &Matcher,
) -> bool {
    match operator {
        Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            compare_numeric(operator, actual, expected)
        }
        Operator::Eq => actual.unwrap_or(expr::ABSENT_LITERAL) == expected,
        Operator::Neq => actual.unwrap_or(expr::ABSENT_LITERAL) != expected,
        Operator::In => {
            let value = actual.unwrap_or(expr::ABSENT_LITERAL);
            expected.split(expr::LIST_SEPARATOR).any(|item| item == value)
        }
        Operator::Nin => {
            let value = actual.unwrap_or(expr::ABSENT_LITERAL);
            !expected.split(expr::LIST_SEPARATOR).any(|item| item == value)
        }
        Operator::Regex => match (actual, matcher) {
            (Some(value), Matcher::Regex(Some(regex))) => regex.is_match(value),
            _ => false,
        },
        Operator::Predicate => match (actual, matcher) {
            (Some(value), Matcher::Predicate(Some(predicate))) => predicate.eval(value),
            _ => false,
        },
        Operator::Unsupported(name) => {
            record_failure(condition_error_labels::UNSUPPORTED, operator, name);
            false
        }
    }
}
