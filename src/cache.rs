use crate::error::StorageError;
use crate::metrics::METRICS;
use crate::r#const::{cache_labels, cache_limits, storage_keys};
use crate::storage::Storage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// 缓存结果类型别名
pub type CacheResult<T> = Result<T, StorageError>;

// 持久化的缓存条目
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    // 写入时间（秒，Unix 时间戳）
    timestamp: f64,
    // 服务器IP列表
    server_ip_list: Vec<String>,
}

/// 缓存命中结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAnswer {
    pub server_ip_list: Vec<String>,
    // 剩余有效期（秒，向下取整）
    pub ttl: u64,
}

// 缓存键: resolve_cache$<domain>$<client_ip>
pub fn cache_key(domain: &str, client_ip: &str) -> String {
    format!(
        "{}{}{}{}{}",
        storage_keys::RESOLVE_CACHE_PREFIX,
        storage_keys::SEPARATOR,
        domain,
        storage_keys::SEPARATOR,
        client_ip
    )
}

// 分区内所有缓存键的公共前缀
fn cache_key_prefix() -> String {
    format!(
        "{}{}",
        storage_keys::RESOLVE_CACHE_PREFIX,
        storage_keys::SEPARATOR
    )
}

// 当前时间（秒）
pub fn now_seconds() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// 计算剩余有效期
///
/// 剩余时间 `max_age - (now - timestamp)` 不小于 `min_ttl` 时返回向下取整的剩余秒数，
/// 否则返回 `None`。
pub fn remaining_ttl(timestamp: f64, now: f64, max_age: u64, min_ttl: u64) -> Option<u64> {
    let remaining = max_age as f64 - (now - timestamp);
    if remaining >= min_ttl as f64 {
        Some(remaining.floor() as u64)
    } else {
        None
    }
}

// 解析结果缓存
pub struct ResolveCache {
    // 持久化存储
    storage: Arc<Storage>,
    // 条目最长有效期（秒）
    max_age: u64,
}

impl ResolveCache {
    // 创建新的解析缓存
    pub fn new(storage: Arc<Storage>, max_age: u64) -> Self {
        let max_age = max_age.clamp(cache_limits::MIN_CACHE_TTL, cache_limits::MAX_CACHE_TTL);

        info!("Creating resolve cache - Max age: {}s", max_age);

        Self { storage, max_age }
    }

    // 条目最长有效期
    pub fn max_age(&self) -> u64 {
        self.max_age
    }

    // 查询缓存，剩余有效期不足 min_ttl 时视为未命中
    pub async fn get(
        &self,
        domain: &str,
        client_ip: &str,
        min_ttl: u64,
    ) -> CacheResult<Option<CachedAnswer>> {
        let raw = match self.storage.existing_partition(domain)? {
            Some(partition) => partition.get(&cache_key(domain, client_ip)).await,
            None => Ok(None),
        };
        let raw = match raw {
            Ok(raw) => raw,
            Err(e) => {
                METRICS
                    .cache_operations_total()
                    .with_label_values(&[cache_labels::READ_ERROR])
                    .inc();
                return Err(e);
            }
        };

        let Some(raw) = raw else {
            METRICS
                .cache_operations_total()
                .with_label_values(&[cache_labels::MISS])
                .inc();
            return Ok(None);
        };

        // 无法解析的条目按未命中处理，下次成功解析时覆盖
        let entry: CacheEntry = match serde_json::from_slice(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    "Ignoring corrupt cache entry - Domain: {}, Client: {}, Error: {}",
                    domain, client_ip, e
                );
                METRICS
                    .cache_operations_total()
                    .with_label_values(&[cache_labels::CORRUPT])
                    .inc();
                return Ok(None);
            }
        };

        match remaining_ttl(entry.timestamp, now_seconds(), self.max_age, min_ttl) {
            Some(ttl) => {
                debug!(
                    "Cache hit - Domain: {}, Client: {}, Remaining: {}s",
                    domain, client_ip, ttl
                );
                METRICS
                    .cache_operations_total()
                    .with_label_values(&[cache_labels::HIT])
                    .inc();
                METRICS
                    .cache_ttl_seconds()
                    .with_label_values(&[cache_labels::HIT])
                    .observe(ttl as f64);
                Ok(Some(CachedAnswer {
                    server_ip_list: entry.server_ip_list,
                    ttl,
                }))
            }
            None => {
                debug!(
                    "Cache entry too old - Domain: {}, Client: {}, Min TTL: {}s",
                    domain, client_ip, min_ttl
                );
                METRICS
                    .cache_operations_total()
                    .with_label_values(&[cache_labels::STALE])
                    .inc();
                Ok(None)
            }
        }
    }

    // 写入缓存，总是覆盖并以当前时间为时间戳
    pub async fn put(
        &self,
        domain: &str,
        client_ip: &str,
        server_ip_list: &[String],
    ) -> CacheResult<()> {
        self.put_with_timestamp(domain, client_ip, server_ip_list, now_seconds())
            .await
    }

    // 以指定时间戳写入缓存
    pub async fn put_with_timestamp(
        &self,
        domain: &str,
        client_ip: &str,
        server_ip_list: &[String],
        timestamp: f64,
    ) -> CacheResult<()> {
        let entry = CacheEntry {
            timestamp,
            server_ip_list: server_ip_list.to_vec(),
        };
        let value =
            serde_json::to_vec(&entry).map_err(|e| StorageError::Encode(e.to_string()))?;

        let result = match self.storage.partition(domain) {
            Ok(partition) => partition.put(&cache_key(domain, client_ip), value).await,
            Err(e) => Err(e),
        };

        let label = if result.is_ok() {
            cache_labels::INSERT
        } else {
            cache_labels::INSERT_ERROR
        };
        METRICS
            .cache_operations_total()
            .with_label_values(&[label])
            .inc();

        result
    }

    // 清空域名下的所有缓存条目，返回删除数量
    pub async fn clear(&self, domain: &str) -> CacheResult<usize> {
        let removed = match self.storage.existing_partition(domain)? {
            Some(partition) => partition.delete_prefix(&cache_key_prefix()).await?,
            None => 0,
        };

        info!("Cache cleared - Domain: {}, Entries: {}", domain, removed);
        METRICS
            .cache_operations_total()
            .with_label_values(&[cache_labels::CLEAR])
            .inc();

        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_layout() {
        assert_eq!(
            cache_key("www.163.com", "1.2.3.4"),
            "resolve_cache$www.163.com$1.2.3.4"
        );
        assert!(cache_key("a.com", "1.1.1.1").starts_with(&cache_key_prefix()));
    }

    #[test]
    fn test_remaining_ttl_boundaries() {
        // now - T == A - m 时仍然可用
        assert_eq!(remaining_ttl(1000.0, 1000.0 + 86399.0, 86400, 1), Some(1));
        assert_eq!(remaining_ttl(1000.0, 1000.0 + 86399.5, 86400, 1), None);
        assert_eq!(remaining_ttl(1000.0, 1000.0, 86400, 1), Some(86400));
        assert_eq!(remaining_ttl(1000.0, 1000.5, 86400, 1), Some(86399));
        assert_eq!(remaining_ttl(1000.0, 1000.0, 86400, 86401), None);
    }
}
