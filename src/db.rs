// ==========================================
// 教学大纲管理系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为，避免“部分模块外键开启/部分不开启”
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 内嵌建库 DDL，保证应用与测试使用同一套 schema
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// 说明：
/// - 版本号用于提示/告警（不做自动迁移），避免静默在旧库上运行导致隐性错误。
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启（级联删除依赖它）
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
///
/// 表结构分层:
/// - 参照数据: subject / program / academic_year / app_user / program_plo / subject_subscription
/// - 聚合根: syllabus 及其全部子表（外键级联删除）
/// - 流程记录: workflow_log（只插入）/ current_workflow（每份大纲至多一行）
/// - 版本留痕: syllabus_snapshot（只插入）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS config_kv (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- ===== 参照数据（由外部 CRUD 服务维护，这里只做存在性校验） =====
        CREATE TABLE IF NOT EXISTS subject (
            subject_id TEXT PRIMARY KEY,
            subject_code TEXT NOT NULL UNIQUE,
            subject_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS program (
            program_id TEXT PRIMARY KEY,
            program_code TEXT NOT NULL UNIQUE,
            program_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS academic_year (
            academic_year_id TEXT PRIMARY KEY,
            year_name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS app_user (
            user_id TEXT PRIMARY KEY,
            user_name TEXT NOT NULL,
            role TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS program_plo (
            plo_id TEXT PRIMARY KEY,
            program_id TEXT NOT NULL REFERENCES program(program_id),
            plo_code TEXT NOT NULL,
            description TEXT,
            UNIQUE(program_id, plo_code)
        );

        CREATE TABLE IF NOT EXISTS subject_subscription (
            subject_id TEXT NOT NULL REFERENCES subject(subject_id),
            student_id TEXT NOT NULL REFERENCES app_user(user_id),
            PRIMARY KEY (subject_id, student_id)
        );

        -- ===== 聚合根 =====
        CREATE TABLE IF NOT EXISTS syllabus (
            syllabus_id TEXT PRIMARY KEY,
            subject_id TEXT NOT NULL REFERENCES subject(subject_id),
            program_id TEXT NOT NULL REFERENCES program(program_id),
            academic_year_id TEXT NOT NULL REFERENCES academic_year(academic_year_id),
            lecturer_id TEXT NOT NULL REFERENCES app_user(user_id),
            status TEXT NOT NULL,
            version TEXT NOT NULL,
            description TEXT,
            objectives_json TEXT,
            time_allocation_json TEXT,
            prerequisites TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS syllabus_clo (
            clo_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            clo_code TEXT NOT NULL,
            description TEXT,
            UNIQUE(syllabus_id, clo_code)
        );

        CREATE TABLE IF NOT EXISTS clo_plo_mapping (
            mapping_id TEXT PRIMARY KEY,
            clo_id TEXT NOT NULL REFERENCES syllabus_clo(clo_id) ON DELETE CASCADE,
            plo_id TEXT NOT NULL REFERENCES program_plo(plo_id),
            level TEXT NOT NULL,
            UNIQUE(clo_id, plo_id)
        );

        CREATE TABLE IF NOT EXISTS syllabus_material (
            material_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            material_type TEXT NOT NULL,
            title TEXT NOT NULL,
            author TEXT,
            publisher TEXT,
            isbn TEXT,
            url TEXT
        );

        CREATE TABLE IF NOT EXISTS teaching_plan (
            plan_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            week_no INTEGER NOT NULL,
            topic TEXT,
            activity TEXT,
            assessment_note TEXT,
            UNIQUE(syllabus_id, week_no)
        );

        CREATE TABLE IF NOT EXISTS assessment_scheme (
            scheme_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            scheme_name TEXT NOT NULL,
            weight_pct REAL NOT NULL
        );

        CREATE TABLE IF NOT EXISTS assessment_component (
            component_id TEXT PRIMARY KEY,
            scheme_id TEXT NOT NULL REFERENCES assessment_scheme(scheme_id) ON DELETE CASCADE,
            component_name TEXT NOT NULL,
            weight_pct REAL NOT NULL,
            criteria TEXT
        );

        CREATE TABLE IF NOT EXISTS assessment_rubric (
            rubric_id TEXT PRIMARY KEY,
            component_id TEXT NOT NULL REFERENCES assessment_component(component_id) ON DELETE CASCADE,
            criteria TEXT NOT NULL,
            max_score REAL NOT NULL,
            pass_desc TEXT,
            fail_desc TEXT
        );

        CREATE TABLE IF NOT EXISTS assessment_clo (
            component_id TEXT NOT NULL REFERENCES assessment_component(component_id) ON DELETE CASCADE,
            clo_id TEXT NOT NULL REFERENCES syllabus_clo(clo_id) ON DELETE CASCADE,
            PRIMARY KEY (component_id, clo_id)
        );

        -- ===== 流程记录 =====
        -- 红线: workflow_log 只插入，任何代码路径不得 UPDATE/DELETE 单条日志
        CREATE TABLE IF NOT EXISTS workflow_log (
            log_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            actor_id TEXT NOT NULL,
            action TEXT NOT NULL,
            from_status TEXT NOT NULL,
            to_status TEXT NOT NULL,
            comment TEXT,
            created_at TEXT NOT NULL
        );

        -- 红线: 每份在途大纲至多一行（主键即 syllabus_id），终态时删除整行
        CREATE TABLE IF NOT EXISTS current_workflow (
            syllabus_id TEXT PRIMARY KEY REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            status TEXT NOT NULL,
            due_date TEXT NOT NULL,
            last_action_at TEXT NOT NULL
        );

        -- ===== 版本留痕（只插入） =====
        CREATE TABLE IF NOT EXISTS syllabus_snapshot (
            snapshot_id TEXT PRIMARY KEY,
            syllabus_id TEXT NOT NULL REFERENCES syllabus(syllabus_id) ON DELETE CASCADE,
            version TEXT NOT NULL,
            payload_json TEXT NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?)",
        params![CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();
        init_schema(&conn).unwrap();
        // 重复初始化不报错
        init_schema(&conn).unwrap();
        assert_eq!(
            read_schema_version(&conn).unwrap(),
            Some(CURRENT_SCHEMA_VERSION)
        );
    }
}
