// src/agendador.rs
//! Tarefa mensal: um temporizador acorda no dia 1 de cada mês às 00:00 e
//! põe a tarefa numa fila; um trabalhador consome a fila fora do caminho
//! dos pedidos HTTP. A tabela `tarefas_mensais` garante uma execução por mês,
//! mesmo que o temporizador dispare duas vezes ou o servidor reinicie.

use crate::error::{falha_transacao, AppResult};
use chrono::{Datelike, Local, Months, NaiveDateTime};
use sqlx::SqlitePool;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const CAPACIDADE_FILA: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TarefaMensal {
    /// Mês de referência, `YYYY-MM`.
    pub mes: String,
}

/// Primeiro instante do mês seguinte a `agora`.
pub fn proxima_execucao(agora: NaiveDateTime) -> Option<NaiveDateTime> {
    agora
        .date()
        .with_day(1)?
        .checked_add_months(Months::new(1))?
        .and_hms_opt(0, 0, 0)
}

/// Corre a tarefa do mês numa transação. Devolve `false` se o mês já
/// tinha sido processado.
pub async fn executar_tarefa_mensal(db_pool: &SqlitePool, mes: &str) -> AppResult<bool> {
    let mut tx = db_pool.begin().await.map_err(falha_transacao)?;

    let registada = sqlx::query(
        "INSERT INTO tarefas_mensais (mes, executada_em) VALUES (?1, ?2) ON CONFLICT (mes) DO NOTHING",
    )
    .bind(mes)
    .bind(Local::now().naive_local())
    .execute(&mut *tx)
    .await
    .map_err(falha_transacao)?
    .rows_affected();

    if registada == 0 {
        tracing::info!("Tarefa mensal de {} já executada, ignorando.", mes);
        return Ok(false);
    }

    // Reservado para a geração automática de mensalidades.

    tx.commit().await.map_err(falha_transacao)?;
    tracing::info!("🗓️ Tarefa mensal de {} concluída.", mes);
    Ok(true)
}

async fn temporizador(fila: mpsc::Sender<TarefaMensal>) {
    loop {
        let agora = Local::now().naive_local();
        let Some(proxima) = proxima_execucao(agora) else {
            tracing::error!("Não foi possível calcular a próxima execução a partir de {}", agora);
            break;
        };
        let espera = (proxima - agora).to_std().unwrap_or_default();
        tracing::debug!("Próxima tarefa mensal em {} ({:?}).", proxima, espera);
        tokio::time::sleep(espera).await;

        let tarefa = TarefaMensal {
            mes: proxima.format("%Y-%m").to_string(),
        };
        if fila.send(tarefa).await.is_err() {
            tracing::warn!("Fila da tarefa mensal fechada, parando temporizador.");
            break;
        }
    }
}

async fn trabalhador(db_pool: SqlitePool, mut fila: mpsc::Receiver<TarefaMensal>) {
    while let Some(tarefa) = fila.recv().await {
        if let Err(e) = executar_tarefa_mensal(&db_pool, &tarefa.mes).await {
            tracing::error!("Erro na tarefa mensal de {}: {:?}", tarefa.mes, e);
        }
    }
}

/// Arranca o temporizador e o trabalhador em tasks separadas.
pub fn iniciar(db_pool: SqlitePool) -> (JoinHandle<()>, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(CAPACIDADE_FILA);
    let timer = tokio::spawn(temporizador(tx));
    let worker = tokio::spawn(trabalhador(db_pool, rx));
    (timer, worker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn instante(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn proxima_e_dia_um_do_mes_seguinte() {
        assert_eq!(
            proxima_execucao(instante(2024, 6, 15, 13)),
            Some(instante(2024, 7, 1, 0))
        );
        assert_eq!(
            proxima_execucao(instante(2024, 12, 31, 23)),
            Some(instante(2025, 1, 1, 0))
        );
        // à meia-noite do dia 1 já conta o mês seguinte
        assert_eq!(
            proxima_execucao(instante(2024, 2, 1, 0)),
            Some(instante(2024, 3, 1, 0))
        );
    }

    #[sqlx::test]
    async fn uma_execucao_por_mes(pool: SqlitePool) {
        assert!(executar_tarefa_mensal(&pool, "2024-07").await.unwrap());
        assert!(!executar_tarefa_mensal(&pool, "2024-07").await.unwrap());
        assert!(executar_tarefa_mensal(&pool, "2024-08").await.unwrap());

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tarefas_mensais")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(total, 2);
    }

    #[sqlx::test]
    async fn trabalhador_consome_fila(pool: SqlitePool) {
        let (tx, rx) = mpsc::channel(CAPACIDADE_FILA);
        let worker = tokio::spawn(trabalhador(pool.clone(), rx));

        for mes in ["2024-09", "2024-09", "2024-10"] {
            tx.send(TarefaMensal { mes: mes.into() }).await.unwrap();
        }
        drop(tx);
        worker.await.unwrap();

        let meses: Vec<String> =
            sqlx::query_scalar("SELECT mes FROM tarefas_mensais ORDER BY mes")
                .fetch_all(&pool)
                .await
                .unwrap();
        assert_eq!(meses, vec!["2024-09", "2024-10"]);
    }
}
