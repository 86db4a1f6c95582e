use crate::expr::Condition;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// 表达式表：表达式ID -> 条件
pub type ExpressionTable = HashMap<String, Condition>;

// 种子调度规则表：源域名 -> 有序规则列表
pub type SeedRuleTable = HashMap<String, Vec<SeedRuleConfig>>;

// 种子调度规则
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SeedRuleConfig {
    // 改写目标域名
    pub target: String,
    // 引用的表达式ID，全部满足时命中
    #[serde(default)]
    pub expressions: Vec<String>,
}
