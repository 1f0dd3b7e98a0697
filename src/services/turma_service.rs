// src/services/turma_service.rs
use crate::{
    error::{falha_transacao, AppError, AppResult},
    models::{
        turma::{
            AlunoMatriculado, AlunoMatriculadoRow, HistoricoMatricula, Matricula, Turma, TurmaComAlunos,
            TurmaResumo,
        },
        user::Papel,
    },
};
use chrono::Local;
use sqlx::{Sqlite, SqlitePool, Transaction};

pub const ACAO_MATRICULA: &str = "Matrícula";
pub const ACAO_DESMATRICULA: &str = "Desmatrícula";
pub const VENCIMENTO_PADRAO: i64 = 10;

pub async fn find_turma(db_pool: &SqlitePool, turma_id: i64) -> AppResult<Option<Turma>> {
    let turma = sqlx::query_as::<_, Turma>("SELECT * FROM turmas WHERE id = ?1")
        .bind(turma_id)
        .fetch_optional(db_pool)
        .await?;
    Ok(turma)
}

/// Cria uma turma ativa para um professor existente.
pub async fn criar_turma(
    db_pool: &SqlitePool,
    nome: &str,
    professor_id: Option<i64>,
) -> AppResult<Turma> {
    let nome = nome.trim();
    let Some(professor_id) = professor_id.filter(|_| !nome.is_empty()) else {
        tracing::warn!("Criação de turma rejeitada: campos em falta.");
        return Err(AppError::ValidationMissing("Preencha todos os campos!".into()));
    };

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let papel: Option<Papel> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?1")
        .bind(professor_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(falha_transacao)?;
    match papel {
        None => return Err(AppError::NotFound("Professor não encontrado.".into())),
        Some(Papel::Aluno) => {
            return Err(AppError::ValidationMissing(
                "O utilizador escolhido não é professor.".into(),
            ))
        }
        Some(Papel::Professor) => {}
    }

    let turma = sqlx::query_as::<_, Turma>(
        "INSERT INTO turmas (nome, professor_id, ativa) VALUES (?1, ?2, 1) RETURNING *",
    )
    .bind(nome)
    .bind(professor_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(falha_transacao)?;

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("✅ Turma '{}' criada (id {}).", turma.nome, turma.id);
    Ok(turma)
}

/// Inverte `ativa`. Devolve a turma já com o novo estado.
pub async fn alterar_status_turma(db_pool: &SqlitePool, turma_id: i64) -> AppResult<Turma> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let turma = sqlx::query_as::<_, Turma>(
        "UPDATE turmas SET ativa = NOT ativa WHERE id = ?1 RETURNING *",
    )
    .bind(turma_id)
    .fetch_optional(&mut *tx)
    .await
    .map_err(falha_transacao)?
    .ok_or_else(|| AppError::NotFound("Turma não encontrada.".into()))?;

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Turma {} agora ativa={}", turma.id, turma.ativa);
    Ok(turma)
}

async fn registrar_historico(
    tx: &mut Transaction<'_, Sqlite>,
    aluno_id: i64,
    turma_id: i64,
    acao: &str,
) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO historico_matriculas (aluno_id, turma_id, data_acao, acao) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(aluno_id)
    .bind(turma_id)
    .bind(Local::now().naive_local())
    .bind(acao)
    .execute(&mut **tx)
    .await
    .map_err(falha_transacao)?;
    Ok(())
}

/// Matricula um aluno numa turma e regista no histórico.
pub async fn matricular_aluno(
    db_pool: &SqlitePool,
    turma_id: i64,
    aluno_id: i64,
    dia_vencimento: Option<i64>,
) -> AppResult<Matricula> {
    let vencimento = dia_vencimento.unwrap_or(VENCIMENTO_PADRAO).clamp(1, 31);

    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let turma_existe: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM turmas WHERE id = ?1)")
        .bind(turma_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(falha_transacao)?;
    if !turma_existe {
        return Err(AppError::NotFound("Turma não encontrada.".into()));
    }

    let aluno_existe: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1 AND role = 'aluno')",
    )
    .bind(aluno_id)
    .fetch_one(&mut *tx)
    .await
    .map_err(falha_transacao)?;
    if !aluno_existe {
        return Err(AppError::NotFound("Aluno não encontrado.".into()));
    }

    let matricula = sqlx::query_as::<_, Matricula>(
        r#"
        INSERT INTO matriculas (user_id, turma_id, data_matricula, data_vencimento)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT (user_id, turma_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(aluno_id)
    .bind(turma_id)
    .bind(Local::now().naive_local())
    .bind(vencimento)
    .fetch_optional(&mut *tx)
    .await
    .map_err(falha_transacao)?
    .ok_or_else(|| AppError::Duplicate("Aluno já matriculado nesta turma.".into()))?;

    registrar_historico(&mut tx, aluno_id, turma_id, ACAO_MATRICULA).await?;
    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!(
        "Aluno {} matriculado na turma {} (vence dia {:?}).",
        aluno_id,
        turma_id,
        matricula.data_vencimento
    );
    Ok(matricula)
}

/// Remove a matrícula e regista a desmatrícula no histórico.
pub async fn remover_aluno(db_pool: &SqlitePool, turma_id: i64, aluno_id: i64) -> AppResult<()> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let removidas = sqlx::query("DELETE FROM matriculas WHERE user_id = ?1 AND turma_id = ?2")
        .bind(aluno_id)
        .bind(turma_id)
        .execute(&mut *tx)
        .await
        .map_err(falha_transacao)?
        .rows_affected();
    if removidas == 0 {
        return Err(AppError::NotFound("Matrícula não encontrada.".into()));
    }

    registrar_historico(&mut tx, aluno_id, turma_id, ACAO_DESMATRICULA).await?;
    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("Aluno {} desmatriculado da turma {}.", aluno_id, turma_id);
    Ok(())
}

pub async fn listar_alunos_turma(
    db_pool: &SqlitePool,
    turma_id: i64,
) -> AppResult<Vec<AlunoMatriculado>> {
    let rows = sqlx::query_as::<_, AlunoMatriculadoRow>(
        r#"
        SELECT u.id, u.username, u.email, m.data_matricula, m.data_vencimento
        FROM matriculas m
        JOIN users u ON u.id = m.user_id
        WHERE m.turma_id = ?1
        ORDER BY u.username ASC
        "#,
    )
    .bind(turma_id)
    .fetch_all(db_pool)
    .await?;
    Ok(rows.into_iter().map(AlunoMatriculado::from).collect())
}

/// Turmas com total de alunos faturados e inadimplentes.
pub async fn listar_turmas_resumo(db_pool: &SqlitePool) -> AppResult<Vec<TurmaResumo>> {
    let turmas = sqlx::query_as::<_, TurmaResumo>(
        r#"
        SELECT
            t.id,
            t.nome,
            t.ativa,
            p.username AS professor_nome,
            COUNT(DISTINCT m.aluno_id) AS total_alunos,
            COUNT(DISTINCT CASE WHEN m.status != 'Pago' THEN m.aluno_id END) AS inadimplentes
        FROM turmas t
        JOIN users p ON p.id = t.professor_id
        LEFT JOIN mensalidades m ON m.turma_id = t.id
        GROUP BY t.id
        ORDER BY t.nome ASC
        "#,
    )
    .fetch_all(db_pool)
    .await?;
    Ok(turmas)
}

/// Turmas de um professor com os respetivos alunos (duas queries, sem N+1).
pub async fn listar_turmas_professor(
    db_pool: &SqlitePool,
    professor_id: i64,
) -> AppResult<Vec<TurmaComAlunos>> {
    let turmas = sqlx::query_as::<_, Turma>(
        "SELECT * FROM turmas WHERE professor_id = ?1 ORDER BY nome ASC",
    )
    .bind(professor_id)
    .fetch_all(db_pool)
    .await?;

    let linhas = sqlx::query_as::<_, (i64, i64, String, Option<String>, chrono::NaiveDateTime, Option<i64>)>(
        r#"
        SELECT m.turma_id, u.id, u.username, u.email, m.data_matricula, m.data_vencimento
        FROM matriculas m
        JOIN turmas t ON t.id = m.turma_id
        JOIN users u ON u.id = m.user_id
        WHERE t.professor_id = ?1
        ORDER BY u.username ASC
        "#,
    )
    .bind(professor_id)
    .fetch_all(db_pool)
    .await?;

    let resultado = turmas
        .into_iter()
        .map(|turma| {
            let alunos = linhas
                .iter()
                .filter(|linha| linha.0 == turma.id)
                .map(|(_, id, username, email, data_matricula, data_vencimento)| {
                    AlunoMatriculado::from(AlunoMatriculadoRow {
                        id: *id,
                        username: username.clone(),
                        email: email.clone(),
                        data_matricula: *data_matricula,
                        data_vencimento: *data_vencimento,
                    })
                })
                .collect();
            TurmaComAlunos { turma, alunos }
        })
        .collect();
    Ok(resultado)
}

/// Histórico de matrículas de um aluno, mais recente primeiro.
pub async fn historico_matriculas(
    db_pool: &SqlitePool,
    aluno_id: i64,
) -> AppResult<Vec<HistoricoMatricula>> {
    let historico = sqlx::query_as::<_, HistoricoMatricula>(
        r#"
        SELECT h.id, h.aluno_id, h.turma_id, t.nome AS turma_nome, h.data_acao, h.acao
        FROM historico_matriculas h
        JOIN turmas t ON t.id = h.turma_id
        WHERE h.aluno_id = ?1
        ORDER BY h.data_acao DESC, h.id DESC
        "#,
    )
    .bind(aluno_id)
    .fetch_all(db_pool)
    .await?;
    Ok(historico)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{models::user::RegisterForm, services::user_service};

    pub(crate) async fn novo_aluno(pool: &SqlitePool, username: &str) -> i64 {
        let form = RegisterForm {
            username: username.into(),
            password: "pw".into(),
            ..Default::default()
        };
        user_service::register_user(pool, &form).await.unwrap()
    }

    pub(crate) async fn novo_professor(pool: &SqlitePool, nome: &str) -> i64 {
        user_service::cadastrar_professor(pool, nome, &format!("{nome}@gaia.com"), "pw")
            .await
            .unwrap()
    }

    #[sqlx::test]
    async fn criar_turma_valida_campos(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let aluno = novo_aluno(&pool, "ana").await;

        let turma = criar_turma(&pool, "Hatha Manhã", Some(prof)).await.unwrap();
        assert!(turma.ativa);
        assert_eq!(turma.professor_id, prof);

        assert!(matches!(
            criar_turma(&pool, "  ", Some(prof)).await,
            Err(AppError::ValidationMissing(_))
        ));
        assert!(matches!(
            criar_turma(&pool, "Vinyasa", None).await,
            Err(AppError::ValidationMissing(_))
        ));
        assert!(matches!(
            criar_turma(&pool, "Vinyasa", Some(9999)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            criar_turma(&pool, "Vinyasa", Some(aluno)).await,
            Err(AppError::ValidationMissing(_))
        ));
    }

    #[sqlx::test]
    async fn alterar_status_alterna(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let turma = criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();

        assert!(!alterar_status_turma(&pool, turma.id).await.unwrap().ativa);
        assert!(alterar_status_turma(&pool, turma.id).await.unwrap().ativa);
        assert!(matches!(
            alterar_status_turma(&pool, 4242).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    async fn matricula_e_desmatricula_com_historico(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let aluno = novo_aluno(&pool, "ana").await;
        let turma = criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();

        matricular_aluno(&pool, turma.id, aluno, Some(45)).await.unwrap();
        assert!(matches!(
            matricular_aluno(&pool, turma.id, aluno, None).await,
            Err(AppError::Duplicate(_))
        ));

        let alunos = listar_alunos_turma(&pool, turma.id).await.unwrap();
        assert_eq!(alunos.len(), 1);
        assert_eq!(alunos[0].username, "ana");
        assert_eq!(alunos[0].vencimento, Some(31));

        remover_aluno(&pool, turma.id, aluno).await.unwrap();
        assert!(listar_alunos_turma(&pool, turma.id).await.unwrap().is_empty());
        assert!(matches!(
            remover_aluno(&pool, turma.id, aluno).await,
            Err(AppError::NotFound(_))
        ));

        let historico = historico_matriculas(&pool, aluno).await.unwrap();
        let acoes: Vec<&str> = historico.iter().map(|h| h.acao.as_str()).collect();
        assert_eq!(acoes, vec![ACAO_DESMATRICULA, ACAO_MATRICULA]);
    }

    #[sqlx::test]
    async fn vencimento_padrao_e_limitado(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let turma = criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();
        let mut esperado = Vec::new();
        for (nome, dia, gravado) in [("ana", None, 10), ("bia", Some(0), 1), ("caio", Some(15), 15)] {
            let aluno = novo_aluno(&pool, nome).await;
            let matricula = matricular_aluno(&pool, turma.id, aluno, dia).await.unwrap();
            assert_eq!(matricula.data_vencimento, Some(gravado));
            esperado.push((aluno, Some(gravado)));
        }

        let matriculas = sqlx::query_as::<_, Matricula>(
            "SELECT * FROM matriculas WHERE turma_id = ?1 ORDER BY user_id",
        )
        .bind(turma.id)
        .fetch_all(&pool)
        .await
        .unwrap();
        let obtido: Vec<(i64, Option<i64>)> = matriculas
            .iter()
            .map(|m| (m.user_id, m.data_vencimento))
            .collect();
        assert_eq!(obtido, esperado);
    }

    #[sqlx::test]
    async fn matricula_rejeita_inexistentes(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let turma = criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();

        assert!(matches!(
            matricular_aluno(&pool, turma.id, 777, None).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            matricular_aluno(&pool, 888, prof, None).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[sqlx::test]
    async fn turmas_do_professor_agrupam_alunos(pool: SqlitePool) {
        let prof = novo_professor(&pool, "rita").await;
        let outro = novo_professor(&pool, "caio").await;
        let ana = novo_aluno(&pool, "ana").await;
        let bia = novo_aluno(&pool, "bia").await;

        let hatha = criar_turma(&pool, "Hatha", Some(prof)).await.unwrap();
        let yin = criar_turma(&pool, "Yin", Some(prof)).await.unwrap();
        let alheia = criar_turma(&pool, "Kundalini", Some(outro)).await.unwrap();
        matricular_aluno(&pool, hatha.id, bia, None).await.unwrap();
        matricular_aluno(&pool, hatha.id, ana, None).await.unwrap();
        matricular_aluno(&pool, alheia.id, ana, None).await.unwrap();

        let turmas = listar_turmas_professor(&pool, prof).await.unwrap();
        assert_eq!(turmas.len(), 2);
        assert_eq!(turmas[0].turma.id, hatha.id);
        let nomes: Vec<&str> = turmas[0].alunos.iter().map(|a| a.username.as_str()).collect();
        assert_eq!(nomes, vec!["ana", "bia"]);
        assert_eq!(turmas[1].turma.id, yin.id);
        assert!(turmas[1].alunos.is_empty());
    }
}
