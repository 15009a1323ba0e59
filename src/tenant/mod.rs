use parking_lot::RwLock;
use std::collections::HashMap;

use crate::core::TenantContext;
use crate::error::Result;

/// 租户目录服务
pub trait TenantDirectory: Send + Sync {
    /// 除根租户外的活跃租户，按目录顺序
    fn list_active_tenants(&self) -> Result<Vec<TenantContext>>;
    fn is_tenant_eligible_for_indexing(&self, tenant_id: i32) -> bool;
    /// 索引是否由显式登录加载：
    /// `Some(false)` = 匿名访问隐式加载，`None` = 未加载 / 未知
    fn loaded_from_login(&self, tenant_id: i32) -> Option<bool>;
    fn evict_tenant_index(&self, tenant_id: i32);
}

#[derive(Clone, Debug)]
struct TenantState {
    ctx: TenantContext,
    eligible: bool,
    loaded_from_login: Option<bool>,
}

type EvictHook = Box<dyn Fn(i32) + Send + Sync>;

/// 静态租户目录（来自配置）
///
/// 驱逐时把加载状态清回 `None`，并回调 `on_evict`（如卸载内存索引）。
pub struct StaticTenantDirectory {
    order: RwLock<Vec<i32>>,
    tenants: RwLock<HashMap<i32, TenantState>>,
    on_evict: Option<EvictHook>,
}

impl StaticTenantDirectory {
    pub fn new() -> Self {
        Self {
            order: RwLock::new(Vec::new()),
            tenants: RwLock::new(HashMap::new()),
            on_evict: None,
        }
    }

    pub fn with_evict_hook(mut self, hook: impl Fn(i32) + Send + Sync + 'static) -> Self {
        self.on_evict = Some(Box::new(hook));
        self
    }

    /// 注册 / 覆盖租户；根租户不进入活跃列表但可以设置资格
    pub fn insert(&self, ctx: TenantContext, eligible: bool, loaded_from_login: Option<bool>) {
        let id = ctx.tenant_id;
        let prev = self.tenants.write().insert(
            id,
            TenantState {
                ctx,
                eligible,
                loaded_from_login,
            },
        );
        if prev.is_none() {
            self.order.write().push(id);
        }
    }

    pub fn set_loaded_from_login(&self, tenant_id: i32, loaded: Option<bool>) {
        if let Some(t) = self.tenants.write().get_mut(&tenant_id) {
            t.loaded_from_login = loaded;
        }
    }
}

impl Default for StaticTenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory for StaticTenantDirectory {
    fn list_active_tenants(&self) -> Result<Vec<TenantContext>> {
        let tenants = self.tenants.read();
        Ok(self
            .order
            .read()
            .iter()
            .filter_map(|id| tenants.get(id))
            .filter(|t| !t.ctx.is_root())
            .map(|t| t.ctx.clone())
            .collect())
    }

    fn is_tenant_eligible_for_indexing(&self, tenant_id: i32) -> bool {
        // 未登记的租户（包括根租户）默认可索引
        self.tenants
            .read()
            .get(&tenant_id)
            .map(|t| t.eligible)
            .unwrap_or(true)
    }

    fn loaded_from_login(&self, tenant_id: i32) -> Option<bool> {
        self.tenants
            .read()
            .get(&tenant_id)
            .and_then(|t| t.loaded_from_login)
    }

    fn evict_tenant_index(&self, tenant_id: i32) {
        self.set_loaded_from_login(tenant_id, None);
        if let Some(hook) = &self.on_evict {
            hook(tenant_id);
        }
    }
}
