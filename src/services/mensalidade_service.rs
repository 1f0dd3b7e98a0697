// src/services/mensalidade_service.rs
use crate::{
    error::{falha_transacao, AppError, AppResult},
    models::financeiro::{Mensalidade, MensalidadeDetalhe, StatusPagamento},
};
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqlitePool;
use std::collections::BTreeSet;

/// Valida um mês de referência no formato `YYYY-MM`.
pub fn validar_mes(mes: &str) -> AppResult<String> {
    let mes = mes.trim();
    let valido = mes.len() == 7
        && NaiveDate::parse_from_str(&format!("{mes}-01"), "%Y-%m-%d").is_ok();
    if valido {
        Ok(mes.to_string())
    } else {
        Err(AppError::ValidationMissing(
            "Mês de referência inválido (use AAAA-MM).".into(),
        ))
    }
}

fn validar_valor(valor: f64) -> AppResult<f64> {
    if valor.is_finite() && valor >= 0.0 {
        Ok(valor)
    } else {
        Err(AppError::ValidationMissing("Valor inválido.".into()))
    }
}

/// Gera uma mensalidade Pendente por matrícula de cada aluno para `mes`.
/// Pares (aluno, turma, mês) já faturados são ignorados. Devolve quantas
/// foram criadas; qualquer falha desfaz o lote inteiro.
pub async fn gerar_mensalidades_lote(
    db_pool: &SqlitePool,
    alunos_ids: &[i64],
    mes: &str,
    valor: f64,
) -> AppResult<u64> {
    if alunos_ids.is_empty() {
        return Err(AppError::ValidationMissing("Selecione pelo menos um aluno!".into()));
    }
    let mes = validar_mes(mes)?;
    let valor = validar_valor(valor)?;
    let alunos: BTreeSet<i64> = alunos_ids.iter().copied().collect();

    tracing::info!("Gerando mensalidades de {} para {} aluno(s)", mes, alunos.len());
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    let mut criadas = 0u64;

    for aluno_id in alunos {
        let matriculas = sqlx::query_as::<_, (i64, i64, NaiveDateTime)>(
            r#"
            SELECT m.turma_id, t.professor_id, m.data_matricula
            FROM matriculas m
            JOIN turmas t ON t.id = m.turma_id
            WHERE m.user_id = ?1
            "#,
        )
        .bind(aluno_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(falha_transacao)?;

        for (turma_id, professor_id, data_matricula) in matriculas {
            // UNIQUE(aluno_id, turma_id, mes) torna a repetição segura
            let inseridas = sqlx::query(
                r#"
                INSERT INTO mensalidades (aluno_id, turma_id, professor_id, mes, valor, status, data_matricula)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT (aluno_id, turma_id, mes) DO NOTHING
                "#,
            )
            .bind(aluno_id)
            .bind(turma_id)
            .bind(professor_id)
            .bind(&mes)
            .bind(valor)
            .bind(StatusPagamento::Pendente)
            .bind(data_matricula.date())
            .execute(&mut *tx)
            .await
            .map_err(falha_transacao)?
            .rows_affected();

            if inseridas == 0 {
                tracing::debug!("Mensalidade {} já existe para aluno {} turma {}", mes, aluno_id, turma_id);
            }
            criadas += inseridas;
        }
    }

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("✅ {} mensalidades geradas para {}.", criadas, mes);
    Ok(criadas)
}

/// Lança manualmente uma mensalidade para um aluno matriculado.
pub async fn criar_mensalidade(
    db_pool: &SqlitePool,
    aluno_id: i64,
    turma_id: i64,
    mes: &str,
    valor: f64,
) -> AppResult<Mensalidade> {
    let mes = validar_mes(mes)?;
    let valor = validar_valor(valor)?;

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let matricula = sqlx::query_as::<_, (i64, NaiveDateTime)>(
        r#"
        SELECT t.professor_id, m.data_matricula
        FROM matriculas m
        JOIN turmas t ON t.id = m.turma_id
        WHERE m.user_id = ?1 AND m.turma_id = ?2
        "#,
    )
    .bind(aluno_id)
    .bind(turma_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(falha_transacao)?;
    let Some((professor_id, data_matricula)) = matricula else {
        return Err(AppError::NotFound("Matrícula não encontrada.".into()));
    };

    let mensalidade = sqlx::query_as::<_, Mensalidade>(
        r#"
        INSERT INTO mensalidades (aluno_id, turma_id, professor_id, mes, valor, status, data_matricula)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (aluno_id, turma_id, mes) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(aluno_id)
    .bind(turma_id)
    .bind(professor_id)
    .bind(&mes)
    .bind(valor)
    .bind(StatusPagamento::Pendente)
    .bind(data_matricula.date())
    .fetch_optional(&mut *tx)
    .await
    .map_err(falha_transacao)?
    .ok_or_else(|| AppError::Duplicate(format!("Já existe mensalidade de {} para esta turma.", mes)))?;

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Mensalidade {} criada manualmente (aluno {}, {}).", mensalidade.id, aluno_id, mes);
    Ok(mensalidade)
}

/// Marca como paga. Repetir sobre uma já paga não altera nada.
pub async fn marcar_mensalidade_paga(db_pool: &SqlitePool, mensalidade_id: i64) -> AppResult<()> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;
    let afetadas = sqlx::query("UPDATE mensalidades SET status = ?1 WHERE id = ?2")
        .bind(StatusPagamento::Pago)
        .bind(mensalidade_id)
        .execute(&mut *tx)
        .await
        .map_err(falha_transacao)?
        .rows_affected();
    if afetadas == 0 {
        return Err(AppError::NotFound("Mensalidade não encontrada.".into()));
    }
    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Mensalidade {} marcada como paga.", mensalidade_id);
    Ok(())
}

pub async fn mensalidades_do_aluno(
    db_pool: &SqlitePool,
    aluno_id: i64,
) -> AppResult<Vec<MensalidadeDetalhe>> {
    let mensalidades = sqlx::query_as::<_, MensalidadeDetalhe>(
        r#"
        SELECT m.id, a.username AS aluno, t.nome AS turma, m.mes, m.valor, m.status
        FROM mensalidades m
        JOIN users a ON a.id = m.aluno_id
        JOIN turmas t ON t.id = m.turma_id
        WHERE m.aluno_id = ?1
        ORDER BY m.mes DESC, t.nome ASC
        "#,
    )
    .bind(aluno_id)
    .fetch_all(db_pool)
    .await?;
    Ok(mensalidades)
}

pub async fn listar_mensalidades(db_pool: &SqlitePool) -> AppResult<Vec<MensalidadeDetalhe>> {
    let mensalidades = sqlx::query_as::<_, MensalidadeDetalhe>(
        r#"
        SELECT m.id, a.username AS aluno, t.nome AS turma, m.mes, m.valor, m.status
        FROM mensalidades m
        JOIN users a ON a.id = m.aluno_id
        JOIN turmas t ON t.id = m.turma_id
        ORDER BY m.mes DESC, a.username ASC
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(mensalidades)
}
