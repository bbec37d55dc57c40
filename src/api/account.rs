use super::Api;
use crate::Result;
use crate::client::ApiRequest;

impl Api {
    /// Ask the mfa service whether two-factor auth can be enabled.
    ///
    /// Returns the HTTP status of a successful call; error statuses surface
    /// as [`Error::RequestFailed`](crate::Error::RequestFailed).
    pub async fn two_factor_status(&self) -> Result<u16> {
        let url = self.endpoints().mfa_enable_url();
        let response = self.gateway.call(ApiRequest::post(url)).await?;
        Ok(response.status().as_u16())
    }

    /// Turn two-factor auth off and record it locally.
    ///
    /// Returns `false` if the service refused; storage failures are still
    /// reported as errors.
    pub async fn disable_two_factor(&self) -> Result<bool> {
        let url = self.endpoints().mfa_disable_url();
        match self.gateway.call(ApiRequest::put(url)).await {
            Ok(_) => {
                self.profile().set_two_factor(false).await?;
                tracing::info!("Two-factor authentication disabled");
                Ok(true)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to disable two-factor authentication");
                Ok(false)
            }
        }
    }
}
