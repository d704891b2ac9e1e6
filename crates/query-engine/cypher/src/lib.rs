pub mod cypher;
