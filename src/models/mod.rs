// src/models/mod.rs
pub mod financeiro;
pub mod presenca;
pub mod turma;
pub mod user;
