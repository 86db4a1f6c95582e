use crate::config::{ExpressionTable, SeedRuleTable};
use crate::dispatch::DispatchRule;
use crate::error::StorageError;
use crate::metrics::METRICS;
use crate::r#const::{rule_source_labels, storage_keys};
use crate::storage::Storage;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

// 规则来源
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    // 管理接口写入的覆盖规则
    Persisted,
    // 配置文件中的种子规则
    Seed,
    // 无规则
    None,
}

impl RuleSource {
    fn label(&self) -> &'static str {
        match self {
            RuleSource::Persisted => rule_source_labels::PERSISTED,
            RuleSource::Seed => rule_source_labels::SEED,
            RuleSource::None => rule_source_labels::NONE,
        }
    }
}

// 规则查询结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleLookup {
    pub rules: Vec<DispatchRule>,
    pub source: RuleSource,
}

impl RuleLookup {
    // 空结果
    pub fn empty() -> Self {
        Self {
            rules: Vec::new(),
            source: RuleSource::None,
        }
    }
}

// 规则键: dispatch_rule$<domain>
pub fn rule_key(domain: &str) -> String {
    format!(
        "{}{}{}",
        storage_keys::DISPATCH_RULE_PREFIX,
        storage_keys::SEPARATOR,
        domain
    )
}

// 调度规则存储
// 优先读取持久化的覆盖规则，不存在或无效时回退到配置中的种子规则，回退结果不写回
pub struct RuleStore {
    // 持久化存储
    storage: Arc<Storage>,
    // 表达式表
    expressions: ExpressionTable,
    // 种子规则表
    seeds: SeedRuleTable,
}

impl RuleStore {
    // 创建新的规则存储
    pub fn new(storage: Arc<Storage>, expressions: ExpressionTable, seeds: SeedRuleTable) -> Self {
        info!(
            "Creating rule store - Expressions: {}, Seeded domains: {}",
            expressions.len(),
            seeds.len()
        );

        Self {
            storage,
            expressions,
            seeds,
        }
    }

    // 查询域名的调度规则
    pub async fn get_rules(&self, domain: &str) -> Result<RuleLookup, StorageError> {
        let raw = match self.storage.existing_partition(domain)? {
            Some(partition) => partition.get(&rule_key(domain)).await,
            None => Ok(None),
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                METRICS
                    .rule_lookups_total()
                    .with_label_values(&[rule_source_labels::ERROR])
                    .inc();
                return Err(e);
            }
        };

        if let Some(raw) = raw {
            match serde_json::from_slice::<Vec<DispatchRule>>(&raw) {
                Ok(rules) if !rules.is_empty() => {
                    return Ok(self.record(RuleLookup {
                        rules,
                        source: RuleSource::Persisted,
                    }));
                }
                Ok(_) => debug!("Persisted rule list is empty, domain: {}", domain),
                Err(e) => warn!(
                    "Ignoring malformed persisted rules - Domain: {}, Error: {}",
                    domain, e
                ),
            }
        }

        let rules = self.seed_rules(domain);
        let source = if rules.is_empty() {
            RuleSource::None
        } else {
            RuleSource::Seed
        };

        Ok(self.record(RuleLookup { rules, source }))
    }

    // 根据种子表生成规则，未定义的表达式ID直接忽略
    pub fn seed_rules(&self, domain: &str) -> Vec<DispatchRule> {
        let Some(seeds) = self.seeds.get(domain) else {
            return Vec::new();
        };

        seeds
            .iter()
            .map(|seed| {
                let conditions = seed
                    .expressions
                    .iter()
                    .filter_map(|id| {
                        let condition = self.expressions.get(id);
                        if condition.is_none() {
                            debug!("Undefined expression {:?} dropped from seed rule", id);
                        }
                        condition.cloned()
                    })
                    .collect();
                DispatchRule::new(seed.target.clone(), conditions)
            })
            .collect()
    }

    // 写入覆盖规则
    pub async fn set_rules(&self, domain: &str, rules: &[DispatchRule]) -> Result<(), StorageError> {
        let value = serde_json::to_vec(rules).map_err(|e| StorageError::Encode(e.to_string()))?;
        let partition = self.storage.partition(domain)?;
        partition.put(&rule_key(domain), value).await?;

        info!("Dispatch rules updated - Domain: {}, Rules: {}", domain, rules.len());
        Ok(())
    }

    // 删除覆盖规则，返回规则是否存在
    pub async fn delete_rules(&self, domain: &str) -> Result<bool, StorageError> {
        let existed = match self.storage.existing_partition(domain)? {
            Some(partition) => partition.delete(&rule_key(domain)).await?,
            None => false,
        };

        info!("Dispatch rules deleted - Domain: {}, Existed: {}", domain, existed);
        Ok(existed)
    }

    // 记录规则来源指标
    fn record(&self, lookup: RuleLookup) -> RuleLookup {
        METRICS
            .rule_lookups_total()
            .with_label_values(&[lookup.source.label()])
            .inc();
        lookup
    }
}
