pub mod mcp48;
