mod tcpstream;
