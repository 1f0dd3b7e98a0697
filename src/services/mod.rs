// src/services/mod.rs
pub mod auth_service;
pub mod conta_service;
pub mod mensalidade_service;
pub mod presenca_service;
pub mod relatorio_service;
pub mod turma_service;
pub mod user_service;
