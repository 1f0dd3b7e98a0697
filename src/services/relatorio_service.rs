// src/services/relatorio_service.rs
use crate::{
    error::AppResult,
    models::financeiro::{ItemRelatorio, LinhaComissao, RelatorioProfessor, StatusPagamento},
};
use sqlx::SqlitePool;

pub fn calcular_comissao(total_recebido: f64, percentual: f64) -> f64 {
    total_recebido * percentual / 100.0
}

/// Agrupa as linhas por professor. As linhas já vêm ordenadas por
/// professor e aluno; a ordem é preservada.
pub fn montar_relatorio(linhas: Vec<LinhaComissao>, percentual: f64) -> Vec<RelatorioProfessor> {
    let mut relatorio: Vec<RelatorioProfessor> = Vec::new();

    for linha in linhas {
        let mesmo_professor = relatorio
            .last()
            .is_some_and(|bloco| bloco.professor == linha.professor);
        if !mesmo_professor {
            relatorio.push(RelatorioProfessor {
                professor: linha.professor.clone(),
                alunos: Vec::new(),
                total_recebido: 0.0,
                comissao: 0.0,
            });
        }
        let Some(bloco) = relatorio.last_mut() else {
            continue;
        };

        if linha.status == StatusPagamento::Pago {
            bloco.total_recebido += linha.valor;
        }
        bloco.alunos.push(ItemRelatorio {
            aluno: linha.aluno,
            turma: linha.turma,
            mes: linha.mes,
            valor: linha.valor,
            status: linha.status,
        });
    }

    for bloco in &mut relatorio {
        bloco.comissao = calcular_comissao(bloco.total_recebido, percentual);
    }
    relatorio
}

/// Relatório de comissões por professor, opcionalmente filtrado por mês.
pub async fn relatorio_comissoes(
    db_pool: &SqlitePool,
    mes: Option<&str>,
    percentual: f64,
) -> AppResult<Vec<RelatorioProfessor>> {
    let mes = mes.map(str::trim).filter(|m| !m.is_empty());
    tracing::debug!("Gerando relatório de comissões (mês: {:?})", mes);

    let linhas = sqlx::query_as::<_, LinhaComissao>(
        r#"
        SELECT
            p.username AS professor,
            a.username AS aluno,
            t.nome AS turma,
            m.mes,
            m.valor,
            m.status
        FROM mensalidades m
        JOIN users p ON p.id = m.professor_id
        JOIN users a ON a.id = m.aluno_id
        JOIN turmas t ON t.id = m.turma_id
        WHERE ?1 IS NULL OR m.mes = ?1
        ORDER BY p.username ASC, a.username ASC, m.mes ASC
        "#,
    )
    .bind(mes)
    .fetch_all(db_pool)
    .await?;

    Ok(montar_relatorio(linhas, percentual))
}
