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

//! # tridentdb
//!
//! An in-memory, network-accessible data store that speaks a line-oriented,
//! length-prefixed request/response protocol over TCP. Three typed keyspaces
//! share one flat key namespace: byte values with optional TTL, ordered lists
//! with a blocking-pop rendezvous, and append-only ID-ordered streams.
//!
//! See the `protocol` module for the wire codec, `corestore` for the typed
//! store, and `dbnet` for the connection/accept-loop glue that ties them
//! together.

pub mod config;
pub mod corestore;
pub mod dbnet;
pub mod dispatch;
pub mod protocol;
pub mod util;

pub use corestore::Corestore;
