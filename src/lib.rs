// SPDX-License-Identifier: MIT

pub mod fanout;
pub mod sdk;
