use serde::Serialize;

/// Минимальная длина номера льготного документа.
pub const MIN_DOCUMENT_LEN: usize = 6;
/// Скидка по льготному документу.
pub const DISCOUNT_RATE: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivilegeStatus {
    #[default]
    Unverified,
    Valid,
    Invalid,
}

/// Проверка только по длине, содержимое не анализируется.
pub fn verify_code(code: &str) -> PrivilegeStatus {
    if code.chars().count() >= MIN_DOCUMENT_LEN {
        PrivilegeStatus::Valid
    } else {
        PrivilegeStatus::Invalid
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PrivilegeDocument {
    enabled: bool,
    document_number: String,
    status: PrivilegeStatus,
}

impl PrivilegeDocument {
    /// Переключение чекбокса всегда сбрасывает номер и результат проверки.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        self.document_number.clear();
        self.status = PrivilegeStatus::Unverified;
    }

    pub fn set_document_number(&mut self, number: impl Into<String>) {
        self.document_number = number.into();
        self.status = PrivilegeStatus::Unverified;
    }

    pub fn verify(&mut self) -> PrivilegeStatus {
        self.status = verify_code(&self.document_number);
        self.status
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn status(&self) -> PrivilegeStatus {
        self.status
    }

    pub fn document_number(&self) -> &str {
        &self.document_number
    }

    pub fn discount_applies(&self) -> bool {
        self.enabled && self.status == PrivilegeStatus::Valid
    }

    pub fn apply(&self, subtotal: f64) -> f64 {
        if self.discount_applies() {
            subtotal - subtotal * DISCOUNT_RATE
        } else {
            subtotal
        }
    }
}
