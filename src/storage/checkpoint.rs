use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::Result;

/// 默认 checkpoint 在 registry 中的位置（同时作为哨兵路径，扫描时跳过）
pub const DEFAULT_CHECKPOINT_LOCATION: &str =
    "/_system/local/repository/components/org.wso2.carbon.registry/indexing/lastaccesstime";

/// 每租户最后一次成功扫描的时间戳
///
/// 未写过的租户返回 `UNIX_EPOCH`。
pub trait CheckpointStore: Send + Sync {
    fn get(&self, tenant_id: i32) -> Result<SystemTime>;
    fn set(&self, tenant_id: i32, at: SystemTime) -> Result<()>;
    /// checkpoint 自身的存储路径（哨兵）
    fn location(&self) -> &str;
}

pub struct MemoryCheckpointStore {
    location: String,
    inner: Mutex<HashMap<i32, SystemTime>>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::with_location(DEFAULT_CHECKPOINT_LOCATION)
    }

    pub fn with_location(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryCheckpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn get(&self, tenant_id: i32) -> Result<SystemTime> {
        Ok(self
            .inner
            .lock()
            .get(&tenant_id)
            .copied()
            .unwrap_or(UNIX_EPOCH))
    }

    fn set(&self, tenant_id: i32, at: SystemTime) -> Result<()> {
        self.inner.lock().insert(tenant_id, at);
        Ok(())
    }

    fn location(&self) -> &str {
        &self.location
    }
}

#[derive(Serialize, Deserialize, Default)]
struct CheckpointFile {
    /// tenant_id -> (secs, nanos) since epoch
    tenants: HashMap<i32, (u64, u32)>,
}

fn to_unix(ts: SystemTime) -> (u64, u32) {
    match ts.duration_since(UNIX_EPOCH) {
        Ok(d) => (d.as_secs(), d.subsec_nanos()),
        Err(_) => (0, 0),
    }
}

fn from_unix((secs, nanos): (u64, u32)) -> SystemTime {
    UNIX_EPOCH + Duration::new(secs, nanos)
}

/// 文件持久化的 checkpoint
///
/// 落盘：写 `<path>.tmp` → fsync → rename 覆盖。崩溃时旧文件保持完整；
/// 无法解码的文件在 `open` 时报错，不会被覆盖。
pub struct FileCheckpointStore {
    path: PathBuf,
    location: String,
    state: Mutex<CheckpointFile>,
}

impl FileCheckpointStore {
    pub fn open(path: PathBuf, location: impl Into<String>) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let state = if path.exists() {
            let data = std::fs::read(&path)?;
            // 损坏时拒绝启动：清空会让所有租户从 epoch 重扫
            bincode::deserialize::<CheckpointFile>(&data).map_err(|e| {
                anyhow::anyhow!("checkpoint file {:?} is unreadable: {}", path, e)
            })?
        } else {
            CheckpointFile::default()
        };

        Ok(Self {
            path,
            location: location.into(),
            state: Mutex::new(state),
        })
    }

    fn persist(&self, state: &CheckpointFile) -> Result<()> {
        let data = bincode::serialize(state)?;
        let tmp = self.path.with_extension("tmp");
        {
            let mut f = std::fs::File::create(&tmp)?;
            f.write_all(&data)?;
            f.sync_all()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CheckpointStore for FileCheckpointStore {
    fn get(&self, tenant_id: i32) -> Result<SystemTime> {
        Ok(self
            .state
            .lock()
            .tenants
            .get(&tenant_id)
            .copied()
            .map(from_unix)
            .unwrap_or(UNIX_EPOCH))
    }

    fn set(&self, tenant_id: i32, at: SystemTime) -> Result<()> {
        let mut st = self.state.lock();
        let prev = st.tenants.insert(tenant_id, to_unix(at));
        if let Err(e) = self.persist(&st) {
            // 落盘失败：内存状态回滚，保持与磁盘一致
            match prev {
                Some(p) => st.tenants.insert(tenant_id, p),
                None => st.tenants.remove(&tenant_id),
            };
            return Err(e);
        }
        Ok(())
    }

    fn location(&self) -> &str {
        &self.location
    }
}
