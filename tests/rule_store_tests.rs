use httpdns::config::{ExpressionTable, SeedRuleConfig, SeedRuleTable};
use httpdns::dispatch::DispatchRule;
use httpdns::expr::Condition;
use httpdns::rules::{rule_key, RuleSource, RuleStore};
use httpdns::storage::Storage;
use std::sync::Arc;

fn expressions() -> ExpressionTable {
    let mut table = ExpressionTable::new();
    table.insert("expr1".to_string(), Condition::new("$in", "field_1", "v1,v2"));
    table.insert("expr2".to_string(), Condition::new("$gte", "field_2", "15"));
    table
}

fn seeds() -> SeedRuleTable {
    let mut table = SeedRuleTable::new();
    table.insert(
        "www.163.com".to_string(),
        vec![
            SeedRuleConfig {
                target: "mirrors.163.com".to_string(),
                expressions: vec!["expr1".to_string(), "missing".to_string()],
            },
            SeedRuleConfig {
                target: "news.163.com".to_string(),
                expressions: vec!["expr2".to_string()],
            },
        ],
    );
    table
}

fn create_store() -> (Arc<Storage>, RuleStore) {
    let storage = Arc::new(Storage::temporary().unwrap());
    let store = RuleStore::new(Arc::clone(&storage), expressions(), seeds());
    (storage, store)
}

#[tokio::test]
async fn test_seed_fallback_is_not_persisted() {
    let (storage, store) = create_store();

    let lookup = store.get_rules("www.163.com").await.unwrap();
    assert_eq!(lookup.source, RuleSource::Seed);
    assert_eq!(lookup.rules.len(), 2);
    assert_eq!(lookup.rules[0].target, "mirrors.163.com");
    // 未定义的表达式ID被忽略
    assert_eq!(
        lookup.rules[0].conditions,
        vec![Condition::new("$in", "field_1", "v1,v2")]
    );

    assert!(storage.existing_partition("www.163.com").unwrap().is_none());
}

#[tokio::test]
async fn test_unknown_domain_has_no_rules() {
    let (storage, store) = create_store();
    let lookup = store.get_rules("unknown.com").await.unwrap();
    assert_eq!(lookup.source, RuleSource::None);
    assert!(lookup.rules.is_empty());
    assert!(!store.delete_rules("unknown.com").await.unwrap());

    // 只读查询不为域名建分区
    assert_eq!(storage.partition_count(), 0);
}

#[tokio::test]
async fn test_persisted_rules_override_seed() {
    let (_, store) = create_store();
    let rules = vec![DispatchRule::new(
        "override.163.com",
        vec![Condition::new("$eq", "region", "us")],
    )];

    store.set_rules("www.163.com", &rules).await.unwrap();

    let lookup = store.get_rules("www.163.com").await.unwrap();
    assert_eq!(lookup.source, RuleSource::Persisted);
    assert_eq!(lookup.rules, rules);

    // 删除后回退到种子规则
    assert!(store.delete_rules("www.163.com").await.unwrap());
    assert!(!store.delete_rules("www.163.com").await.unwrap());
    let lookup = store.get_rules("www.163.com").await.unwrap();
    assert_eq!(lookup.source, RuleSource::Seed);
}

#[tokio::test]
async fn test_invalid_persisted_rules_fall_back() {
    let (storage, store) = create_store();
    let partition = storage.partition("www.163.com").unwrap();

    partition
        .put(&rule_key("www.163.com"), b"{broken".to_vec())
        .await
        .unwrap();
    assert_eq!(
        store.get_rules("www.163.com").await.unwrap().source,
        RuleSource::Seed
    );

    // 空列表同样回退
    partition
        .put(&rule_key("www.163.com"), b"[]".to_vec())
        .await
        .unwrap();
    assert_eq!(
        store.get_rules("www.163.com").await.unwrap().source,
        RuleSource::Seed
    );
}

#[tokio::test]
async fn test_lookup_serializes_source() {
    let (_, store) = create_store();
    let lookup = store.get_rules("unknown.com").await.unwrap();
    let value = serde_json::to_value(&lookup).unwrap();
    assert_eq!(value["source"], "none");
    assert_eq!(value["rules"], serde_json::json!([]));
}
