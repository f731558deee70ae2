//! Readable reasons for failed Authenticate responses.

use expensa_auth_core::{ErrorClassifier, Response, json_code};

const MISSING_SECRET_MESSAGE: &str = "402 Missing partnerUserSecret";
const INVALID_CODE_MESSAGE: &str = "Invalid code";

/// Maps Authenticate failure codes to the reason shown on the sign-in screen.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorClassifier;

impl ErrorClassifier for DefaultErrorClassifier {
    fn classify(&self, response: &Response) -> String {
        let message = response.message.as_deref();
        let code = match (response.json_code, message) {
            (402, Some(MISSING_SECRET_MESSAGE)) => 401,
            (code, _) => code,
        };
        let reason = match code {
            401 => "Incorrect login or password. Please try again.",
            402 => "Please enter the two-factor authentication code.",
            403 if message == Some(INVALID_CODE_MESSAGE) => {
                "Incorrect two-factor authentication code. Please try again."
            }
            403 => "Invalid sign-in request. Please try again.",
            404 => "Unable to reset password. Please request a new link.",
            405 => "You do not have access to this application.",
            json_code::NOT_AUTHENTICATED => "Your session has expired. Please sign in again.",
            413 => "Your account has been locked. Please contact support.",
            json_code::UNABLE_TO_RETRY => "Unable to reach the server. Check your connection.",
            code => return format!("Unexpected error during sign-in (code {code})."),
        };
        reason.to_string()
    }
}
