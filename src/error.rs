use thiserror::Error;

/// 扫描链路错误分类
///
/// - `Lookup`：日志 / checkpoint / 租户目录读取失败 → 中止当前租户本轮扫描，checkpoint 不动
/// - `Indexing` / `Access`：单条记录失败 → 只影响该条，扫描继续
/// - `Storage` / `Config`：文件存储与配置
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("lookup failed for tenant {tenant_id}: {reason}")]
    Lookup { tenant_id: i32, reason: String },

    #[error("indexing failed for {path}: {reason}")]
    Indexing { path: String, reason: String },

    #[error("access check failed for {path}: {reason}")]
    Access { path: String, reason: String },

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(String),
}

impl ScanError {
    pub fn lookup(tenant_id: i32, reason: impl ToString) -> Self {
        Self::Lookup {
            tenant_id,
            reason: reason.to_string(),
        }
    }

    pub fn indexing(path: &str, reason: impl ToString) -> Self {
        Self::Indexing {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn access(path: &str, reason: impl ToString) -> Self {
        Self::Access {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// 是否属于单条隔离范围（不中止租户扫描）
    pub fn is_entry_scoped(&self) -> bool {
        matches!(self, Self::Indexing { .. } | Self::Access { .. })
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
