
mod code_activation_test;
mod ops_test;
mod pipeline_test;
mod signup_bonus_test;
