use crate::expr::{Condition, RequestContext};
use crate::metrics::METRICS;
use crate::r#const::dispatch_labels;
use serde::{Deserialize, Serialize};
use tracing::debug;

// 调度规则：所有条件满足时将域名改写为 target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "DispatchRuleRepr", into = "DispatchRuleRepr")]
pub struct DispatchRule {
    // 改写目标域名
    pub target: String,
    // 条件列表（与关系）
    pub conditions: Vec<Condition>,
}

impl DispatchRule {
    pub fn new(target: impl Into<String>, conditions: Vec<Condition>) -> Self {
        Self {
            target: target.into(),
            conditions,
        }
    }

    // 所有条件满足时命中，遇到第一个不满足的条件即停止
    pub fn matches(&self, context: &RequestContext) -> bool {
        self.conditions
            .iter()
            .all(|condition| condition.matches(context))
    }
}

// 规则的持久化形式: [target, [[op, field, expected], ...]]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DispatchRuleRepr(String, Vec<Condition>);

impl From<DispatchRuleRepr> for DispatchRule {
    fn from(DispatchRuleRepr(target, conditions): DispatchRuleRepr) -> Self {
        DispatchRule { target, conditions }
    }
}

impl From<DispatchRule> for DispatchRuleRepr {
    fn from(rule: DispatchRule) -> Self {
        DispatchRuleRepr(rule.target, rule.conditions)
    }
}

// 调度匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchMatch {
    // 命中规则的位置
    pub index: usize,
    // 改写后的域名
    pub target: String,
}

// 域名调度引擎
// 规则按顺序检查，第一条完全命中的规则生效，结果只取决于规则列表和请求上下文
pub struct DispatchEngine;

impl DispatchEngine {
    // 返回命中规则的目标域名，未命中时返回 None
    pub fn dispatch(context: &RequestContext, rules: &[DispatchRule]) -> Option<String> {
        Self::dispatch_with_index(context, rules).map(|matched| matched.target)
    }

    // 返回命中规则的位置和目标域名
    pub fn dispatch_with_index(
        context: &RequestContext,
        rules: &[DispatchRule],
    ) -> Option<DispatchMatch> {
        let matched = rules
            .iter()
            .enumerate()
            .find(|(_, rule)| rule.matches(context))
            .map(|(index, rule)| DispatchMatch {
                index,
                target: rule.target.clone(),
            });

        match &matched {
            Some(m) => {
                debug!("Dispatch rule #{} matched, target: {}", m.index, m.target);
                METRICS
                    .dispatch_total()
                    .with_label_values(&[dispatch_labels::REWRITTEN])
                    .inc();
            }
            None => {
                debug!("No dispatch rule matched among {} rules", rules.len());
                METRICS
                    .dispatch_total()
                    .with_label_values(&[dispatch_labels::UNCHANGED])
                    .inc();
            }
        }

        matched
    }
}
