// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LSB init script emission.
//!
//! The template engine knows only `[% KEY %]` substitution; conditional
//! pieces (the sourced config line, the user code block) are pre-rendered
//! here before the template ever sees them.

use std::collections::HashMap;

use hadc_core::template;

use crate::Supervisor;

const INIT_TEMPLATE: &str = r#"#!/bin/sh
### BEGIN INIT INFO
# Provides:          [% NAME %]
# Required-Start:    [% REQUIRED_START %]
# Required-Stop:     [% REQUIRED_STOP %]
# Default-Start:     2 3 4 5
# Default-Stop:      0 1 6
# Short-Description: [% SHORT_DESCRIPTION %]
# Description:       [% DESCRIPTION %]
### END INIT INFO
[% CONFIG_BLOCK %][% USER_BLOCK %]
[% SCRIPT %] $1
"#;

/// Render the init script for this supervisor.
pub fn render(sup: &Supervisor) -> String {
    let config = sup.config();

    let config_block = match &config.init_config {
        Some(path) => format!("\n[ -r {path} ] && . {path}\n"),
        None => String::new(),
    };
    let user_block = match &config.init_code {
        Some(code) => format!("\n{}\n", code.trim_end()),
        None => String::new(),
    };

    let mut vars: HashMap<&str, String> = HashMap::new();
    vars.insert("NAME", config.name.clone());
    vars.insert(
        "REQUIRED_START",
        config
            .lsb_start
            .clone()
            .unwrap_or_else(|| "$syslog $remote_fs".to_string()),
    );
    vars.insert(
        "REQUIRED_STOP",
        config
            .lsb_stop
            .clone()
            .unwrap_or_else(|| "$syslog $remote_fs".to_string()),
    );
    vars.insert(
        "SHORT_DESCRIPTION",
        config.lsb_sdesc.clone().unwrap_or_else(|| config.name.clone()),
    );
    vars.insert(
        "DESCRIPTION",
        config.lsb_desc.clone().unwrap_or_else(|| config.name.clone()),
    );
    vars.insert("CONFIG_BLOCK", config_block);
    vars.insert("USER_BLOCK", user_block);
    vars.insert("SCRIPT", sup.script());

    template::render(INIT_TEMPLATE, &vars)
}

#[cfg(test)]
#[path = "init_script_tests.rs"]
mod tests;
