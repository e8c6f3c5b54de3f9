use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Account roles. Stored as plain text in the `users.role` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Cliente,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Cliente => "cliente",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "cliente" => Some(UserRole::Cliente),
            _ => None,
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog categories for the firm's engagements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Multas,
    Cnh,
    Acidentes,
    Consultoria,
    Recursos,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 5] = [
        ServiceCategory::Multas,
        ServiceCategory::Cnh,
        ServiceCategory::Acidentes,
        ServiceCategory::Consultoria,
        ServiceCategory::Recursos,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Multas => "multas",
            ServiceCategory::Cnh => "cnh",
            ServiceCategory::Acidentes => "acidentes",
            ServiceCategory::Consultoria => "consultoria",
            ServiceCategory::Recursos => "recursos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "multas" => Some(ServiceCategory::Multas),
            "cnh" => Some(ServiceCategory::Cnh),
            "acidentes" => Some(ServiceCategory::Acidentes),
            "consultoria" => Some(ServiceCategory::Consultoria),
            "recursos" => Some(ServiceCategory::Recursos),
            _ => None,
        }
    }

    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The single authoritative case-status enumeration. The legacy system grew
/// a fifth ad hoc value (`parado_na_justica`) next to the four canonical
/// ones; it is a first-class variant here. Unknown strings are rejected at
/// the API boundary instead of being stored verbatim. The column stays TEXT,
/// and rows written by the old system already use exactly these strings.
///
/// Transitions are unconstrained: any status may move to any other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Pendente,
    EmAndamento,
    ParadoNaJustica,
    Concluido,
    Arquivado,
}

impl CaseStatus {
    pub const ALL: [CaseStatus; 5] = [
        CaseStatus::Pendente,
        CaseStatus::EmAndamento,
        CaseStatus::ParadoNaJustica,
        CaseStatus::Concluido,
        CaseStatus::Arquivado,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Pendente => "pendente",
            CaseStatus::EmAndamento => "em_andamento",
            CaseStatus::ParadoNaJustica => "parado_na_justica",
            CaseStatus::Concluido => "concluido",
            CaseStatus::Arquivado => "arquivado",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pendente" => Some(CaseStatus::Pendente),
            "em_andamento" => Some(CaseStatus::EmAndamento),
            "parado_na_justica" => Some(CaseStatus::ParadoNaJustica),
            "concluido" => Some(CaseStatus::Concluido),
            "arquivado" => Some(CaseStatus::Arquivado),
            _ => None,
        }
    }

    pub fn valid_values() -> String {
        Self::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
