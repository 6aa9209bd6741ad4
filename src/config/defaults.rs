//! Default configuration files written on first run.

pub const DEFAULT_REWARDS: &str = r#"# Base rewards before multipliers
points = 12
completion_message = "Quest complete! Rating: %rating% (reward x%multiplier%) earned %points% quest points + %currency% currency"

[currency]
type = "CURRENCY"
amount = 1

# stack-N is worth 64^N units
[currency.stacks]
stack-0 = "stardust-0"
stack-1 = "stardust-1"
"#;

pub const DEFAULT_TIME_BANDS: &str = r#"# Scanned top to bottom; the first band whose max_elapsed_ms is not
# exceeded wins. Leave max_elapsed_ms out for the catch-all band.
[[band]]
display = "Ultra Extreme+"
max_elapsed_ms = 300000
multiplier = 2.0

[[band]]
display = "Extreme"
max_elapsed_ms = 600000
multiplier = 1.8

[[band]]
display = "Master"
max_elapsed_ms = 900000
multiplier = 1.5

[[band]]
display = "Normal"
max_elapsed_ms = 1200000
multiplier = 1.2

[[band]]
display = "Adequate"
max_elapsed_ms = 1800000
multiplier = 1.0

[[band]]
display = "Poor"
multiplier = 0.8
"#;

pub const DEFAULT_MATERIALS: &str = r#"# [materials.<catalog type>.<catalog id>]
[materials.MM_DROPS.fine_wolf_pelt]
min = 16
max = 256
material_level = 1

[materials.MM_DROPS.bottled_beast_blood]
min = 16
max = 256
material_level = 1

[materials.MM_DROPS.wolf_king_fang]
min = 8
max = 128
material_level = 2
"#;

pub const DEFAULT_BOUNTY: &str = r#"[bounty]
# Minutes between publications, sampled uniformly
interval_min = 20
interval_max = 40
bounty_bonus = 1.5
# MATERIAL, KILL or BOTH
allowed_types = "MATERIAL"
announcement = "[Bounty] Collect %material% x%amount% - great rewards for whoever delivers!"
"#;

pub const DEFAULT_TASKS: &str = r#"[material]
# Milliseconds, -1 for no limit
default_time_limit_ms = 3600000

[kill]
default_time_limit_ms = 3600000
"#;

/// (relative path, contents)
pub const DEFAULT_FILES: &[(&str, &str)] = &[
    ("rewards.toml", DEFAULT_REWARDS),
    ("time_bands.toml", DEFAULT_TIME_BANDS),
    ("materials.toml", DEFAULT_MATERIALS),
    ("bounty.toml", DEFAULT_BOUNTY),
    ("tasks.toml", DEFAULT_TASKS),
];
