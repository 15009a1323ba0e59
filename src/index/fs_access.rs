use std::path::{Component, Path, PathBuf};

use crate::core::TenantContext;
use crate::error::{Result, ScanError};
use crate::index::{AccessAction, ResourceAccess};

/// 以本地目录承载资源：`<root>/<tenant_domain>/<resource_path>`
///
/// - 存在性：目标可 stat
/// - 鉴权（Read）：路径不能逃出租户目录；已存在的文件必须可打开
pub struct FsResourceAccess {
    root: PathBuf,
}

impl FsResourceAccess {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// 解析为磁盘路径；含 `..` 等越界分量时返回 None
    pub fn resolve(&self, ctx: &TenantContext, path: &str) -> Option<PathBuf> {
        let mut out = self.root.join(&ctx.tenant_domain);
        for comp in Path::new(path.trim_start_matches('/')).components() {
            match comp {
                Component::Normal(c) => out.push(c),
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }
        Some(out)
    }
}

impl ResourceAccess for FsResourceAccess {
    fn is_authorized(
        &self,
        ctx: &TenantContext,
        path: &str,
        action: AccessAction,
    ) -> Result<bool> {
        let AccessAction::Read = action;
        let Some(p) = self.resolve(ctx, path) else {
            return Ok(false);
        };
        match std::fs::metadata(&p) {
            Ok(meta) if meta.is_file() => Ok(std::fs::File::open(&p).is_ok()),
            Ok(_) => Ok(true),
            // 不存在不算越权，由存在性检查决定
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => Ok(false),
            Err(e) => Err(ScanError::access(path, e)),
        }
    }

    fn resource_exists(&self, ctx: &TenantContext, path: &str) -> Result<bool> {
        let Some(p) = self.resolve(ctx, path) else {
            return Ok(false);
        };
        match std::fs::metadata(&p) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(ScanError::access(path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_tmp_dir(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("audit-indexer-fs-{}-{}", tag, nanos))
    }

    #[test]
    fn resolves_under_tenant_domain() {
        let access = FsResourceAccess::new(PathBuf::from("/srv/res"));
        let ctx = TenantContext::new(1, "acme.com");
        assert_eq!(
            access.resolve(&ctx, "/_system/governance/a.xml"),
            Some(PathBuf::from("/srv/res/acme.com/_system/governance/a.xml"))
        );
        assert_eq!(access.resolve(&ctx, "/a/../../etc/passwd"), None);
    }

    #[test]
    fn existence_and_read_access_follow_the_filesystem() {
        let root = unique_tmp_dir("exists");
        let ctx = TenantContext::new(1, "acme.com");
        std::fs::create_dir_all(root.join("acme.com/docs")).unwrap();
        std::fs::write(root.join("acme.com/docs/a.txt"), b"a").unwrap();

        let access = FsResourceAccess::new(root);
        assert!(access.resource_exists(&ctx, "/docs/a.txt").unwrap());
        assert!(!access.resource_exists(&ctx, "/docs/missing.txt").unwrap());
        assert!(access
            .is_authorized(&ctx, "/docs/a.txt", AccessAction::Read)
            .unwrap());
        assert!(!access
            .is_authorized(&ctx, "/../escape", AccessAction::Read)
            .unwrap());
        assert!(!access.resource_exists(&ctx, "/../escape").unwrap());
    }
}
