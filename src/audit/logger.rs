//! Audit Logger
//!
//! Appends one `logs_auditoria` row per mutating operation and serves the
//! filtered, page-numbered audit screen.

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::audit::entry::{AccessContext, AccessEntry, AccessFilter, AuditEntry, AuditFilter};
use crate::config::PaginationConfig;
use crate::database::models::AcaoAuditoria;
use crate::error::MandatoError;
use crate::listing::{Page, PageRequest};

const AUDIT_SELECT: &str = r#"
    SELECT l.id, l.usuario_id, u.nome AS usuario_nome, l.acao, l.entidade,
           l.entidade_id, l.detalhes, l.criado_em
    FROM logs_auditoria l
    LEFT JOIN usuarios u ON u.id = l.usuario_id
"#;

#[derive(Clone)]
pub struct AuditLogger {
    pool: SqlitePool,
}

impl AuditLogger {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Append one audit entry
    pub async fn record(
        &self,
        usuario_id: Option<i64>,
        acao: AcaoAuditoria,
        entidade: &str,
        entidade_id: Option<i64>,
        detalhes: serde_json::Value,
    ) -> Result<i64, MandatoError> {
        let result = sqlx::query(
            r#"
            INSERT INTO logs_auditoria (usuario_id, acao, entidade, entidade_id, detalhes, criado_em)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(usuario_id)
        .bind(acao)
        .bind(entidade)
        .bind(entidade_id)
        .bind(detalhes.to_string())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        debug!(
            "Audit: {} {} {:?} by {:?}",
            acao, entidade, entidade_id, usuario_id
        );
        Ok(result.last_insert_rowid())
    }

    /// One page of audit entries, newest first
    pub async fn query(
        &self,
        filter: &AuditFilter,
        pagination: &PaginationConfig,
    ) -> Result<Page<AuditEntry>, MandatoError> {
        let request = PageRequest::new(
            filter.page.unwrap_or(1),
            filter.per_page.unwrap_or(0),
            pagination,
        );

        let mut count = QueryBuilder::<Sqlite>::new(
            "SELECT COUNT(*) FROM logs_auditoria l LEFT JOIN usuarios u ON u.id = l.usuario_id",
        );
        push_audit_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(AUDIT_SELECT);
        push_audit_conditions(&mut select, filter);
        select
            .push(" ORDER BY l.criado_em DESC, l.id DESC LIMIT ")
            .push_bind(request.sql_limit())
            .push(" OFFSET ")
            .push_bind(request.sql_offset());

        let items = select
            .build_query_as::<AuditEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::from_parts(items, request, total as usize))
    }

    /// All entries matching the filter, for exports
    pub async fn query_all(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, MandatoError> {
        let mut select = QueryBuilder::<Sqlite>::new(AUDIT_SELECT);
        push_audit_conditions(&mut select, filter);
        select.push(" ORDER BY l.criado_em DESC, l.id DESC");

        Ok(select
            .build_query_as::<AuditEntry>()
            .fetch_all(&self.pool)
            .await?)
    }

    /// Single entry for the details view
    pub async fn get(&self, id: i64) -> Result<AuditEntry, MandatoError> {
        let sql = format!("{} WHERE l.id = ?", AUDIT_SELECT);
        sqlx::query_as::<_, AuditEntry>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| MandatoError::not_found("audit entry", id))
    }

    /// History of one record, oldest first
    pub async fn for_entity(
        &self,
        entidade: &str,
        entidade_id: i64,
    ) -> Result<Vec<AuditEntry>, MandatoError> {
        let sql = format!(
            "{} WHERE l.entidade = ? AND l.entidade_id = ? ORDER BY l.criado_em ASC, l.id ASC",
            AUDIT_SELECT
        );
        Ok(sqlx::query_as::<_, AuditEntry>(&sql)
            .bind(entidade)
            .bind(entidade_id)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Log a login attempt
    pub async fn record_access(
        &self,
        usuario_id: Option<i64>,
        email: &str,
        sucesso: bool,
        motivo: Option<&str>,
        context: &AccessContext,
    ) -> Result<(), MandatoError> {
        sqlx::query(
            r#"
            INSERT INTO logs_acessos (usuario_id, email, sucesso, motivo, ip, user_agent, criado_em)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(usuario_id)
        .bind(email)
        .bind(sucesso)
        .bind(motivo)
        .bind(context.ip.as_deref())
        .bind(context.user_agent.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn query_access(
        &self,
        filter: &AccessFilter,
        pagination: &PaginationConfig,
    ) -> Result<Page<AccessEntry>, MandatoError> {
        let request = PageRequest::new(
            filter.page.unwrap_or(1),
            filter.per_page.unwrap_or(0),
            pagination,
        );

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM logs_acessos");
        push_access_conditions(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, usuario_id, email, sucesso, motivo, ip, user_agent, criado_em FROM logs_acessos",
        );
        push_access_conditions(&mut select, filter);
        select
            .push(" ORDER BY criado_em DESC, id DESC LIMIT ")
            .push_bind(request.sql_limit())
            .push(" OFFSET ")
            .push_bind(request.sql_offset());

        let items = select
            .build_query_as::<AccessEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(Page::from_parts(items, request, total as usize))
    }

    /// Every matching access entry, for export
    pub async fn query_access_all(&self, filter: &AccessFilter) -> Result<Vec<AccessEntry>, MandatoError> {
        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, usuario_id, email, sucesso, motivo, ip, user_agent, criado_em FROM logs_acessos",
        );
        push_access_conditions(&mut select, filter);
        select.push(" ORDER BY criado_em DESC, id DESC");

        Ok(select
            .build_query_as::<AccessEntry>()
            .fetch_all(&self.pool)
            .await?)
    }
}

fn push_audit_conditions<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a AuditFilter) {
    let mut first = true;
    let mut clause = |builder: &mut QueryBuilder<'a, Sqlite>| {
        builder.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    if let Some(usuario_id) = filter.usuario_id {
        clause(builder);
        builder.push("l.usuario_id = ").push_bind(usuario_id);
    }
    if let Some(acao) = filter.acao {
        clause(builder);
        builder.push("l.acao = ").push_bind(acao);
    }
    if let Some(entidade) = filter.entidade.as_deref().filter(|e| !e.trim().is_empty()) {
        clause(builder);
        builder.push("l.entidade = ").push_bind(entidade.trim());
    }
    if let Some(texto) = filter.texto.as_deref().filter(|t| !t.trim().is_empty()) {
        clause(builder);
        builder
            .push("l.detalhes LIKE ")
            .push_bind(format!("%{}%", texto.trim()));
    }
    if let Some(inicio) = filter.data_inicio {
        clause(builder);
        builder.push("date(l.criado_em) >= ").push_bind(inicio);
    }
    if let Some(fim) = filter.data_fim {
        clause(builder);
        builder.push("date(l.criado_em) <= ").push_bind(fim);
    }
}

fn push_access_conditions<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &'a AccessFilter) {
    let mut first = true;
    let mut clause = |builder: &mut QueryBuilder<'a, Sqlite>| {
        builder.push(if first { " WHERE " } else { " AND " });
        first = false;
    };

    if let Some(email) = filter.email.as_deref().filter(|e| !e.trim().is_empty()) {
        clause(builder);
        builder
            .push("lower(email) LIKE ")
            .push_bind(format!("%{}%", email.trim().to_lowercase()));
    }
    if let Some(sucesso) = filter.sucesso {
        clause(builder);
        builder.push("sucesso = ").push_bind(sucesso);
    }
    if let Some(inicio) = filter.data_inicio {
        clause(builder);
        builder.push("date(criado_em) >= ").push_bind(inicio);
    }
    if let Some(fim) = filter.data_fim {
        clause(builder);
        builder.push("date(criado_em) <= ").push_bind(fim);
    }
}
