/*
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 */

pub mod error;

pub use error::{DispatchError, DispatchResult};

/// Build the standard arity error for a verb: `ERR wrong number of arguments for '<VERB>'`.
pub fn arity_error(verb: &str) -> DispatchError {
    DispatchError::protocol(format!("ERR wrong number of arguments for '{verb}'"))
}

/// Ensure `cond` holds, else bail out with the verb's arity error.
#[macro_export]
macro_rules! ensure_arity {
    ($verb:expr, $cond:expr) => {
        if !($cond) {
            return Err($crate::util::arity_error($verb));
        }
    };
}
