//! 嵌入式持久化存储
//!
//! 基于 sled，每个域名独占一棵树（分区）。分区句柄在首次写入时创建并登记，
//! 之后所有请求复用同一个句柄。只读路径使用 [`Storage::existing_partition`]，
//! 不会为未知域名建树。sled 的读写是阻塞调用，统一放在 `spawn_blocking` 中执行。

use crate::error::StorageError;
use crate::metrics::METRICS;
use dashmap::{DashMap, DashSet};
use std::path::Path;
use tracing::{debug, info};

// 存储结果类型别名
pub type StorageResult<T> = Result<T, StorageError>;

// 校验分区名
fn validate_partition_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(StorageError::InvalidPartition(name.to_string()));
    }
    Ok(())
}

/// 分区注册表
pub struct Storage {
    db: sled::Db,
    partitions: DashMap<String, Partition>,
    // 打开数据库时磁盘上已有的树名
    persisted: DashSet<String>,
}

impl Storage {
    /// 打开（或创建）指定目录下的数据库
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        let db = sled::Config::default()
            .path(path.as_ref())
            .mode(sled::Mode::HighThroughput)
            .open()
            .map_err(|e| StorageError::OpenFailed(e.to_string()))?;

        let storage = Self::with_db(db);
        info!(
            "Storage opened at {:?} with {} existing partitions",
            path.as_ref(),
            storage.persisted.len()
        );

        Ok(storage)
    }

    /// 创建进程退出即删除的临时数据库
    pub fn temporary() -> StorageResult<Self> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StorageError::OpenFailed(e.to_string()))?;

        Ok(Self::with_db(db))
    }

    fn with_db(db: sled::Db) -> Self {
        let persisted = db
            .tree_names()
            .into_iter()
            .filter_map(|name| String::from_utf8(name.to_vec()).ok())
            .collect();

        Self {
            db,
            partitions: DashMap::new(),
            persisted,
        }
    }

    /// 获取已存在的分区，不存在时返回 `None` 且不创建
    pub fn existing_partition(&self, domain: &str) -> StorageResult<Option<Partition>> {
        validate_partition_name(domain)?;

        if let Some(partition) = self.partitions.get(domain) {
            return Ok(Some(partition.clone()));
        }
        if self.persisted.contains(domain) {
            return self.partition(domain).map(Some);
        }

        Ok(None)
    }

    /// 获取域名对应的分区，不存在时创建（写路径使用）
    ///
    /// 同一域名的并发首次访问只会打开一次：打开期间持有该键所在分片的写锁。
    pub fn partition(&self, domain: &str) -> StorageResult<Partition> {
        validate_partition_name(domain)?;

        // 快速路径：已登记
        if let Some(partition) = self.partitions.get(domain) {
            return Ok(partition.clone());
        }

        let partition = self
            .partitions
            .entry(domain.to_string())
            .or_try_insert_with(|| {
                debug!("Opening storage partition: {}", domain);
                self.db
                    .open_tree(domain.as_bytes())
                    .map(|tree| Partition {
                        name: domain.to_string(),
                        tree,
                    })
                    .map_err(|e| StorageError::OpenFailed(e.to_string()))
            })?
            .clone();

        // 分片锁已释放
        METRICS.storage_partitions().set(self.partitions.len() as i64);

        Ok(partition)
    }

    /// 已打开的分区数量
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// 将所有写入刷到磁盘
    pub async fn flush(&self) -> StorageResult<usize> {
        self.db
            .flush_async()
            .await
            .map_err(|e| StorageError::WriteFailed(e.to_string()))
    }
}

/// 单个域名的存储分区
#[derive(Clone, Debug)]
pub struct Partition {
    name: String,
    tree: sled::Tree,
}

impl Partition {
    // 分区名（域名）
    pub fn name(&self) -> &str {
        &self.name
    }

    // 读取键
    pub async fn get(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let tree = self.tree.clone();
        let key = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            tree.get(key)
                .map_err(|e| StorageError::ReadFailed(e.to_string()))
                .map(|opt| opt.map(|v| v.to_vec()))
        })
        .await
        .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }

    // 写入键，已存在则覆盖
    pub async fn put(&self, key: &str, value: Vec<u8>) -> StorageResult<()> {
        let tree = self.tree.clone();
        let key = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            tree.insert(key, value)
                .map_err(|e| StorageError::WriteFailed(e.to_string()))
        })
        .await
        .map_err(|e| StorageError::TaskFailed(e.to_string()))??;

        Ok(())
    }

    // 删除键，返回键是否存在
    pub async fn delete(&self, key: &str) -> StorageResult<bool> {
        let tree = self.tree.clone();
        let key = key.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            tree.remove(key)
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))
                .map(|old| old.is_some())
        })
        .await
        .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }

    // 按前缀扫描
    pub async fn scan_prefix(&self, prefix: &str) -> StorageResult<Vec<(String, Vec<u8>)>> {
        let tree = self.tree.clone();
        let prefix = prefix.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            let mut results = Vec::new();
            for item in tree.scan_prefix(prefix) {
                let (k, v) = item.map_err(|e| StorageError::ScanFailed(e.to_string()))?;
                results.push((String::from_utf8_lossy(&k).into_owned(), v.to_vec()));
            }
            Ok(results)
        })
        .await
        .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }

    // 按前缀删除，返回删除的键数量
    pub async fn delete_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let tree = self.tree.clone();
        let prefix = prefix.as_bytes().to_vec();

        tokio::task::spawn_blocking(move || {
            let mut keys = Vec::new();
            for item in tree.scan_prefix(&prefix).keys() {
                keys.push(item.map_err(|e| StorageError::ScanFailed(e.to_string()))?);
            }

            let mut batch = sled::Batch::default();
            for key in &keys {
                batch.remove(key.clone());
            }
            tree.apply_batch(batch)
                .map_err(|e| StorageError::DeleteFailed(e.to_string()))?;

            Ok(keys.len())
        })
        .await
        .map_err(|e| StorageError::TaskFailed(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_partition_names() {
        let storage = Storage::temporary().unwrap();
        assert!(matches!(
            storage.partition(""),
            Err(StorageError::InvalidPartition(_))
        ));
        assert!(matches!(
            storage.partition("bad domain"),
            Err(StorageError::InvalidPartition(_))
        ));
        assert_eq!(storage.partition_count(), 0);
    }

    #[tokio::test]
    async fn test_existing_partition_never_creates() {
        let storage = Storage::temporary().unwrap();

        assert!(storage.existing_partition("example.com").unwrap().is_none());
        assert!(storage.existing_partition("example.com").unwrap().is_none());
        assert_eq!(storage.partition_count(), 0);
        assert!(!storage
            .db
            .tree_names()
            .iter()
            .any(|name| &name[..] == b"example.com"));

        storage
            .partition("example.com")
            .unwrap()
            .put("k", b"v".to_vec())
            .await
            .unwrap();
        let partition = storage.existing_partition("example.com").unwrap().unwrap();
        assert_eq!(partition.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert_eq!(storage.partition_count(), 1);
    }

    #[tokio::test]
    async fn test_delete_prefix_keeps_other_keys() {
        let storage = Storage::temporary().unwrap();
        let partition = storage.partition("example.com").unwrap();

        partition.put("a$1", b"x".to_vec()).await.unwrap();
        partition.put("a$2", b"y".to_vec()).await.unwrap();
        partition.put("b$1", b"z".to_vec()).await.unwrap();

        assert_eq!(partition.delete_prefix("a$").await.unwrap(), 2);
        assert_eq!(partition.delete_prefix("a$").await.unwrap(), 0);
        assert!(partition.get("a$1").await.unwrap().is_none());
        assert_eq!(partition.get("b$1").await.unwrap(), Some(b"z".to_vec()));
        assert!(!partition.delete("missing").await.unwrap());
    }
}
