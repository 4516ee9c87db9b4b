//! 端到端场景测试包, 测试见 `tests/` 目录
