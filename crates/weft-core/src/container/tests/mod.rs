mod wiring_tests;
