//! 多语言错误消息模块
//!
//! 使用rat_embed_lang框架提供统一的错误消息多语言支持

use rat_embed_lang::register_translations;
use std::collections::HashMap;

/// 错误消息翻译注册器
pub struct ErrorMessageI18n;

impl ErrorMessageI18n {
    /// 注册所有错误消息翻译
    pub fn register_all_translations() {
        let mut translations = HashMap::new();

        // 配置错误
        let mut config_errors = HashMap::new();
        config_errors.insert("zh-CN".to_string(), "配置错误: {message}".to_string());
        config_errors.insert("en-US".to_string(), "Configuration error: {message}".to_string());
        config_errors.insert("ja-JP".to_string(), "設定エラー: {message}".to_string());
        translations.insert("error.config".to_string(), config_errors);

        // 未知数据源
        let mut unknown_errors = HashMap::new();
        unknown_errors.insert("zh-CN".to_string(), "数据源 '{key}' 未配置".to_string());
        unknown_errors.insert("en-US".to_string(), "Datasource '{key}' is not configured".to_string());
        unknown_errors.insert("ja-JP".to_string(), "データソース '{key}' は設定されていません".to_string());
        translations.insert("error.unknown_datasource".to_string(), unknown_errors);

        // 连接池耗尽
        let mut exhausted_errors = HashMap::new();
        exhausted_errors.insert("zh-CN".to_string(), "数据源 '{key}' 连接池耗尽: 等待 {waited_ms}ms 后仍无可用连接".to_string());
        exhausted_errors.insert("en-US".to_string(), "Datasource '{key}' pool exhausted: no connection available after waiting {waited_ms}ms".to_string());
        exhausted_errors.insert("ja-JP".to_string(), "データソース '{key}' の接続プールが枯渇しました: {waited_ms}ms 待機しても接続がありません".to_string());
        translations.insert("error.pool_exhausted".to_string(), exhausted_errors);

        // 数据库连接错误
        let mut connection_errors = HashMap::new();
        connection_errors.insert("zh-CN".to_string(), "数据库连接失败: {message}".to_string());
        connection_errors.insert("en-US".to_string(), "Database connection failed: {message}".to_string());
        connection_errors.insert("ja-JP".to_string(), "データベース接続に失敗しました: {message}".to_string());
        translations.insert("error.connection".to_string(), connection_errors);

        // 连接校验失败
        let mut validation_errors = HashMap::new();
        validation_errors.insert("zh-CN".to_string(), "数据源 '{key}' 连接校验失败: {message}".to_string());
        validation_errors.insert("en-US".to_string(), "Datasource '{key}' connection validation failed: {message}".to_string());
        validation_errors.insert("ja-JP".to_string(), "データソース '{key}' の接続検証に失敗しました: {message}".to_string());
        translations.insert("error.validation".to_string(), validation_errors);

        // 连接池已关闭
        let mut closed_errors = HashMap::new();
        closed_errors.insert("zh-CN".to_string(), "数据源 '{key}' 的连接池已关闭".to_string());
        closed_errors.insert("en-US".to_string(), "Connection pool of datasource '{key}' is closed".to_string());
        closed_errors.insert("ja-JP".to_string(), "データソース '{key}' の接続プールは閉じられています".to_string());
        translations.insert("error.pool_closed".to_string(), closed_errors);

        // 关闭失败汇总
        let mut shutdown_errors = HashMap::new();
        shutdown_errors.insert("zh-CN".to_string(), "{count} 个连接池关闭失败: {details}".to_string());
        shutdown_errors.insert("en-US".to_string(), "{count} connection pool(s) failed to close: {details}".to_string());
        shutdown_errors.insert("ja-JP".to_string(), "{count} 個の接続プールのクローズに失敗しました: {details}".to_string());
        translations.insert("error.shutdown".to_string(), shutdown_errors);

        // 序列化错误
        let mut serialization_errors = HashMap::new();
        serialization_errors.insert("zh-CN".to_string(), "数据序列化失败: {message}".to_string());
        serialization_errors.insert("en-US".to_string(), "Data serialization failed: {message}".to_string());
        serialization_errors.insert("ja-JP".to_string(), "データシリアライズが失敗しました: {message}".to_string());
        translations.insert("error.serialization".to_string(), serialization_errors);

        // 建立连接超时
        let mut connect_timeout = HashMap::new();
        connect_timeout.insert("zh-CN".to_string(), "数据源 '{key}' 建立连接超时 ({timeout_ms}ms)".to_string());
        connect_timeout.insert("en-US".to_string(), "Datasource '{key}' connect timed out ({timeout_ms}ms)".to_string());
        connect_timeout.insert("ja-JP".to_string(), "データソース '{key}' の接続がタイムアウトしました ({timeout_ms}ms)".to_string());
        translations.insert("error.connect_timeout".to_string(), connect_timeout);

        // 校验查询超时
        let mut validation_timeout = HashMap::new();
        validation_timeout.insert("zh-CN".to_string(), "校验查询超时 ({timeout_ms}ms)".to_string());
        validation_timeout.insert("en-US".to_string(), "Validation query timed out ({timeout_ms}ms)".to_string());
        validation_timeout.insert("ja-JP".to_string(), "検証クエリがタイムアウトしました ({timeout_ms}ms)".to_string());
        translations.insert("error.validation_timeout".to_string(), validation_timeout);

        // 连接配置与驱动不匹配
        let mut driver_mismatch = HashMap::new();
        driver_mismatch.insert("zh-CN".to_string(), "数据源 '{key}' 的连接配置与驱动 {driver} 不匹配".to_string());
        driver_mismatch.insert("en-US".to_string(), "Connection config of datasource '{key}' does not match driver {driver}".to_string());
        driver_mismatch.insert("ja-JP".to_string(), "データソース '{key}' の接続設定がドライバ {driver} と一致しません".to_string());
        translations.insert("error.driver_mismatch".to_string(), driver_mismatch);

        // 注册所有翻译
        register_translations(translations);
    }

    /// 初始化错误消息多语言支持
    pub fn init() {
        Self::register_all_translations();

        // 从环境变量获取语言设置，默认为zh-CN
        let lang = std::env::var("RAT_LANG")
            .or_else(|_| std::env::var("LANG"))
            .unwrap_or_else(|_| "zh-CN".to_string());

        // 标准化语言代码
        use rat_embed_lang::normalize_language_code;
        let normalized_lang = normalize_language_code(&lang);
        set_language(&normalized_lang);
    }
}

/// 重新导出rat_embed_lang的核心函数
pub use rat_embed_lang::{current_language, set_language, t, tf};
