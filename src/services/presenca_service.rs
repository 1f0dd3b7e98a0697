// src/services/presenca_service.rs
use crate::{
    error::{falha_transacao, AppError, AppResult},
    models::presenca::{Presenca, PresencaHistorico},
};
use chrono::NaiveDate;
use sqlx::SqlitePool;
use std::collections::HashSet;

/// Percentagem de presenças; 0 quando não há aulas registadas.
pub fn calcular_frequencia(presentes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (presentes.min(total) as f64 / total as f64) * 100.0
}

/// Grava a chamada de uma turma para `data_aula`, substituindo qualquer
/// chamada anterior do mesmo dia. Todos os matriculados recebem uma linha;
/// `presentes` decide quem fica presente. Devolve as linhas gravadas.
pub async fn salvar_chamada(
    db_pool: &SqlitePool,
    turma_id: i64,
    presentes: &[i64],
    data_aula: NaiveDate,
) -> AppResult<Vec<Presenca>> {
    let presentes: HashSet<i64> = presentes.iter().copied().collect();
    tracing::info!(
        "Salvando chamada da turma {} em {} ({} presentes)",
        turma_id,
        data_aula,
        presentes.len()
    );

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let turma_existe: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM turmas WHERE id = ?1)")
        .bind(turma_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(falha_transacao)?;
    if !turma_existe {
        return Err(AppError::NotFound("Turma não encontrada.".into()));
    }

    let removidas = sqlx::query("DELETE FROM presencas WHERE turma_id = ?1 AND data_aula = ?2")
        .bind(turma_id)
        .bind(data_aula)
        .execute(&mut *tx)
        .await
        .map_err(falha_transacao)?
        .rows_affected();
    if removidas > 0 {
        tracing::debug!("Chamada anterior substituída ({} linhas).", removidas);
    }

    let matriculados: Vec<i64> =
        sqlx::query_scalar("SELECT user_id FROM matriculas WHERE turma_id = ?1 ORDER BY user_id")
            .bind(turma_id)
            .fetch_all(&mut *tx)
            .await
            .map_err(falha_transacao)?;

    let mut gravadas = Vec::with_capacity(matriculados.len());
    for aluno_id in &matriculados {
        let presenca = sqlx::query_as::<_, Presenca>(
            r#"
            INSERT INTO presencas (user_id, turma_id, data_aula, presente)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING *
            "#,
        )
        .bind(aluno_id)
        .bind(turma_id)
        .bind(data_aula)
        .bind(presentes.contains(aluno_id))
        .fetch_one(&mut *tx)
        .await
        .map_err(falha_transacao)?;
        gravadas.push(presenca);
    }

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("✅ Chamada da turma {} gravada ({} alunos).", turma_id, gravadas.len());
    Ok(gravadas)
}

/// Todas as presenças do aluno, mais recentes primeiro.
pub async fn historico_presenca(
    db_pool: &SqlitePool,
    aluno_id: i64,
) -> AppResult<Vec<PresencaHistorico>> {
    let historico = sqlx::query_as::<_, PresencaHistorico>(
        r#"
        SELECT p.data_aula, t.nome AS turma, p.presente
        FROM presencas p
        JOIN turmas t ON t.id = p.turma_id
        WHERE p.user_id = ?1
        ORDER BY p.data_aula DESC, t.nome ASC
        "#,
    )
    .bind(aluno_id)
    .fetch_all(db_pool)
    .await?;
    Ok(historico)
}

/// Frequência do aluno sobre todo o histórico, em todas as turmas.
pub async fn frequencia_aluno(db_pool: &SqlitePool, aluno_id: i64) -> AppResult<f64> {
    let (total, presentes): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COALESCE(SUM(presente), 0) FROM presencas WHERE user_id = ?1",
    )
    .bind(aluno_id)
    .fetch_one(db_pool)
    .await?;
    Ok(calcular_frequencia(presentes.max(0) as u64, total.max(0) as u64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        services::turma_service::{
            self,
            tests::{novo_aluno, novo_professor},
        },
    };

    fn dia(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn linhas(pool: &SqlitePool, turma_id: i64, data: NaiveDate) -> Vec<Presenca> {
        sqlx::query_as::<_, Presenca>(
            "SELECT * FROM presencas WHERE turma_id = ?1 AND data_aula = ?2 ORDER BY user_id",
        )
        .bind(turma_id)
        .bind(data)
        .fetch_all(pool)
        .await
        .unwrap()
    }

    #[test]
    fn frequencia_limites() {
        assert_eq!(calcular_frequencia(0, 0), 0.0);
        assert_eq!(calcular_frequencia(3, 4), 75.0);
        assert_eq!(calcular_frequencia(4, 4), 100.0);
        for total in 0..20u64 {
            for presentes in 0..=total {
                let f = calcular_frequencia(presentes, total);
                assert!((0.0..=100.0).contains(&f));
            }
        }
    }

    #[sqlx::test]
    async fn reenvio_substitui_chamada_do_dia(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let a1 = novo_aluno(&pool, "a1").await;
        let a2 = novo_aluno(&pool, "a2").await;
        let a3 = novo_aluno(&pool, "a3").await;
        let fora = novo_aluno(&pool, "fora").await;
        let turma = turma_service::criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();
        for aluno in [a1, a2, a3] {
            turma_service::matricular_aluno(&pool, turma.id, aluno, None).await.unwrap();
        }
        let hoje = dia(2024, 6, 1);

        salvar_chamada(&pool, turma.id, &[a1, a2], hoje).await.unwrap();
        // quem não está matriculado é ignorado
        let gravadas = salvar_chamada(&pool, turma.id, &[a2, a3, fora], hoje).await.unwrap();
        assert_eq!(gravadas.len(), 3);
        assert_eq!(gravadas.iter().filter(|p| p.presente).count(), 2);

        let rows = linhas(&pool, turma.id, hoje).await;
        let estado: Vec<(i64, bool)> = rows.iter().map(|p| (p.user_id, p.presente)).collect();
        assert_eq!(estado, vec![(a1, false), (a2, true), (a3, true)]);
    }

    #[sqlx::test]
    async fn chamada_de_outro_dia_fica_intacta(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let ana = novo_aluno(&pool, "ana").await;
        let turma = turma_service::criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();
        turma_service::matricular_aluno(&pool, turma.id, ana, None).await.unwrap();

        salvar_chamada(&pool, turma.id, &[ana], dia(2024, 6, 1)).await.unwrap();
        salvar_chamada(&pool, turma.id, &[], dia(2024, 6, 2)).await.unwrap();

        assert!(linhas(&pool, turma.id, dia(2024, 6, 1)).await[0].presente);
        assert!(!linhas(&pool, turma.id, dia(2024, 6, 2)).await[0].presente);
        assert_eq!(frequencia_aluno(&pool, ana).await.unwrap(), 50.0);

        let historico = historico_presenca(&pool, ana).await.unwrap();
        assert_eq!(historico.len(), 2);
        assert_eq!(historico[0].data_aula, dia(2024, 6, 2));
        assert_eq!(historico[0].turma, "Hatha");
    }

    #[sqlx::test]
    async fn frequencia_sem_historico_e_zero(pool: SqlitePool) {
        let ana = novo_aluno(&pool, "ana").await;
        assert_eq!(frequencia_aluno(&pool, ana).await.unwrap(), 0.0);
        assert!(historico_presenca(&pool, ana).await.unwrap().is_empty());
    }

    #[sqlx::test]
    async fn chamada_turma_inexistente(pool: SqlitePool) {
        assert!(matches!(
            salvar_chamada(&pool, 404, &[], dia(2024, 6, 1)).await,
            Err(AppError::NotFound(_))
        ));
    }
}
