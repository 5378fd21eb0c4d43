/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("InvalidRequest : {0}")]
    InvalidRequest(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("PushNotConfigured")]
    PushNotConfigured,
    #[error("KeyDecodeFailed : {0}")]
    KeyDecodeFailed(String),
    #[error("RuntimeRegistrationFailed : {0}")]
    RuntimeRegistrationFailed(String),
    #[error("SubscriptionFailed : {0}")]
    SubscriptionFailed(String),
    #[error("ExternalAPICallError : {0}")]
    ExternalAPICallError(String),
    #[error("InternalError : {0}")]
    InternalError(String),
}
