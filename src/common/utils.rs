/*  Copyright 2022-23, Juspay India Pvt Ltd
    This program is free software: you can redistribute it and/or modify it under the terms of the GNU Affero General Public License
    as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version. This program
    is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
    or FITNESS FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more details. You should have received a copy of
    the GNU Affero General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.
*/

use crate::{
    common::types::{PushSubscription, RawSubscription, SubscriptionKeys},
    tools::error::AppError,
};
use base64::{
    engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
    Engine,
};

/// Converts a VAPID public key from URL-safe base64 text to the raw byte
/// layout the platform's subscribe primitive expects. Accepts both padded
/// and unpadded input; `-`/`_` are part of the URL-safe alphabet already, so
/// only padding has to be normalized away before decoding.
pub fn vapid_key_to_bytes(public_key: &str) -> Result<Vec<u8>, AppError> {
    let trimmed = public_key.trim().trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .map_err(|err| AppError::KeyDecodeFailed(err.to_string()))
}

/// Standard base64 with padding, the encoding the backend stores key
/// material in.
pub fn encode_key_material(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn encode_subscription(raw: &RawSubscription) -> PushSubscription {
    PushSubscription {
        endpoint: raw.endpoint.to_owned(),
        keys: SubscriptionKeys {
            p256dh: encode_key_material(&raw.p256dh),
            auth: encode_key_material(&raw.auth),
        },
    }
}
