// ==========================================
// 工艺路线编排系统 - 配置管理器
// ==========================================
// 职责: 配置加载、校验、保存
// 存储: JSON 文件（显式路径 > 环境变量 > 用户配置目录）
// ==========================================

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::routing_config::RoutingConfig;

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    /// 配置文件路径环境变量
    pub const ENV_CONFIG_PATH: &str = "ROUTING_DESIGNER_CONFIG";
    /// 用户配置目录下的子目录名
    pub const CONFIG_DIR_NAME: &str = "routing-designer";
    /// 配置文件名
    pub const CONFIG_FILE_NAME: &str = "config.json";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: Arc<RoutingConfig>,
    source_path: Option<PathBuf>,
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(RoutingConfig::default())
    }
}

impl ConfigManager {
    /// 以内存配置创建
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            config: Arc::new(config),
            source_path: None,
        }
    }

    /// 从指定 JSON 文件加载
    ///
    /// # 返回
    /// - Ok(ConfigManager): 文件不存在时使用默认配置
    /// - Err: 文件无法读取、JSON 格式错误或取值无效
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self {
                config: Arc::new(RoutingConfig::default()),
                source_path: Some(path.to_path_buf()),
            });
        }

        let raw = fs::read_to_string(path)?;
        let config: RoutingConfig = serde_json::from_str(&raw)?;
        config.validate()?;

        tracing::info!(path = %path.display(), "配置加载完成");
        Ok(Self {
            config: Arc::new(config),
            source_path: Some(path.to_path_buf()),
        })
    }

    /// 按默认位置加载（不会失败）
    ///
    /// 查找顺序：
    /// 1. 环境变量 ROUTING_DESIGNER_CONFIG
    /// 2. {用户配置目录}/routing-designer/config.json
    ///
    /// 文件格式错误时记录警告并回退到默认配置
    pub fn load_default() -> Self {
        let path = match default_config_path() {
            Some(p) => p,
            None => {
                tracing::warn!("无法确定用户配置目录，使用默认配置");
                return Self::default();
            }
        };

        match Self::load_from_path(&path) {
            Ok(manager) => manager,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "配置文件格式错误，使用默认配置"
                );
                Self::default()
            }
        }
    }

    /// 保存为格式化 JSON（自动创建父目录）
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn Error>> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self.config.as_ref())?;
        fs::write(path, json)?;
        tracing::info!(path = %path.display(), "配置已保存");
        Ok(())
    }

    pub fn config(&self) -> &RoutingConfig {
        &self.config
    }

    /// 共享只读配置（供各工作区注入）
    pub fn shared(&self) -> Arc<RoutingConfig> {
        Arc::clone(&self.config)
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }
}

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(config_keys::ENV_CONFIG_PATH) {
        let trimmed = p.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    dirs::config_dir().map(|dir| {
        dir.join(config_keys::CONFIG_DIR_NAME)
            .join(config_keys::CONFIG_FILE_NAME)
    })
}
