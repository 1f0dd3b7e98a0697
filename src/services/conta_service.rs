// src/services/conta_service.rs
use crate::{
    error::{falha_transacao, AppError, AppResult},
    models::financeiro::{ContaPagar, ResumoFinanceiro, StatusPagamento},
};
use chrono::NaiveDate;
use sqlx::SqlitePool;

/// Regista uma conta a pagar. Os valores chegam crus do formulário.
pub async fn adicionar_conta(
    db_pool: &SqlitePool,
    descricao: &str,
    valor: &str,
    vencimento: &str,
) -> AppResult<ContaPagar> {
    let descricao = descricao.trim();
    let valor: Option<f64> = valor.trim().replace(',', ".").parse().ok();
    let vencimento = NaiveDate::parse_from_str(vencimento.trim(), "%Y-%m-%d").ok();

    let (Some(valor), Some(vencimento)) = (valor.filter(|v| v.is_finite() && *v >= 0.0), vencimento)
    else {
        return Err(AppError::ValidationMissing("Preencha todos os campos!".into()));
    };
    if descricao.is_empty() {
        return Err(AppError::ValidationMissing("Preencha todos os campos!".into()));
    }

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    let conta = sqlx::query_as::<_, ContaPagar>(
        "INSERT INTO contas_pagar (descricao, valor, vencimento, status) VALUES (?1, ?2, ?3, ?4) RETURNING *",
    )
    .bind(descricao)
    .bind(valor)
    .bind(vencimento)
    .bind(StatusPagamento::Pendente)
    .fetch_one(&mut *tx)
    .await
    .map_err(falha_transacao)?;
    tx.commit().await.map_err(falha_transacao)?;

    tracing::info!("Conta '{}' adicionada (vence {}).", conta.descricao, conta.vencimento);
    Ok(conta)
}

pub async fn marcar_conta_paga(db_pool: &SqlitePool, conta_id: i64) -> AppResult<()> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    let afetadas = sqlx::query("UPDATE contas_pagar SET status = ?1 WHERE id = ?2")
        .bind(StatusPagamento::Pago)
        .bind(conta_id)
        .execute(&mut *tx)
        .await
        .map_err(falha_transacao)?
        .rows_affected();
    if afetadas == 0 {
        return Err(AppError::NotFound("Conta não encontrada.".into()));
    }
    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Conta {} marcada como paga.", conta_id);
    Ok(())
}

pub async fn listar_contas(db_pool: &SqlitePool) -> AppResult<Vec<ContaPagar>> {
    let contas = sqlx::query_as::<_, ContaPagar>(
        "SELECT * FROM contas_pagar ORDER BY vencimento ASC, id ASC",
    )
    .fetch_all(db_pool)
    .await?;
    Ok(contas)
}

/// Totais pendentes a pagar e a receber.
pub async fn resumo_financeiro(db_pool: &SqlitePool) -> AppResult<ResumoFinanceiro> {
    let total_pagar: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(valor), 0.0) FROM contas_pagar WHERE status = 'Pendente'",
    )
    .fetch_one(db_pool)
    .await?;
    let total_receber: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(valor), 0.0) FROM mensalidades WHERE status = 'Pendente'",
    )
    .fetch_one(db_pool)
    .await?;

    Ok(ResumoFinanceiro {
        total_pagar,
        total_receber,
        saldo_estimado: total_receber - total_pagar,
    })
}
